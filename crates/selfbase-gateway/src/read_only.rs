//! Read-only statement vetting.
//!
//! The HTTP query endpoint has no notion of a read-only session, so SQL
//! submitted with `read_only = true` is parsed up front and refused unless
//! every statement is a plain query that calls none of the known
//! side-effecting functions (`set_config`, `nextval`, backend signalling,
//! advisory locks...).
//!
//! The check is syntactic. A user-defined function that writes is not
//! detected; on the HTTP gateway nothing else stops it. The direct Postgres
//! gateway additionally runs read-only SQL in a `READ ONLY` transaction.

use crate::error::GatewayError;
use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};

/// Built-in functions that change server state even inside a `SELECT`.
const SIDE_EFFECT_FUNCTIONS: &[&str] = &[
    "set_config",
    "nextval",
    "setval",
    "pg_terminate_backend",
    "pg_cancel_backend",
    "pg_reload_conf",
    "pg_rotate_logfile",
    "pg_switch_wal",
    "pg_create_restore_point",
    "pg_notify",
    "lo_create",
    "lo_import",
    "lo_export",
    "lo_unlink",
    "dblink_exec",
];

/// Prefixes of function families with the same property.
const SIDE_EFFECT_PREFIXES: &[&str] = &["pg_advisory_", "pg_try_advisory_"];

/// Classifies SQL text as read-only or not.
pub struct ReadOnlyAnalyzer {
    dialect: PostgreSqlDialect,
}

impl Clone for ReadOnlyAnalyzer {
    fn clone(&self) -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }
}

impl Default for ReadOnlyAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadOnlyAnalyzer {
    /// Create a new analyzer.
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    /// Parse a SQL string into statements.
    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>, GatewayError> {
        Parser::parse_sql(&self.dialect, sql).map_err(|e| GatewayError::Parse(e.to_string()))
    }

    /// Fail unless every statement in `sql` is read-only.
    ///
    /// SQL that does not parse is refused: it cannot be proven harmless.
    pub fn ensure_read_only(&self, sql: &str) -> Result<(), GatewayError> {
        let statements = self.parse(sql)?;
        if statements.is_empty() {
            return Err(GatewayError::Parse("no statement found".to_string()));
        }
        for stmt in &statements {
            if !statement_is_read_only(stmt) {
                return Err(GatewayError::NotReadOnly(summarize(stmt)));
            }
        }
        if let Some(function) = self.side_effect_call(sql)? {
            return Err(GatewayError::NotReadOnly(format!("calls {}()", function)));
        }
        Ok(())
    }

    /// First call to a side-effecting function, found on the token stream so
    /// string literals and bare column names do not match.
    fn side_effect_call(&self, sql: &str) -> Result<Option<String>, GatewayError> {
        let tokens: Vec<Token> = Tokenizer::new(&self.dialect, sql)
            .tokenize()
            .map_err(|e| GatewayError::Parse(e.to_string()))?
            .into_iter()
            .filter(|t| !matches!(t, Token::Whitespace(_)))
            .collect();

        for pair in tokens.windows(2) {
            if let [Token::Word(word), Token::LParen] = pair {
                let name = word.value.to_ascii_lowercase();
                if is_side_effect_function(&name) {
                    return Ok(Some(name));
                }
            }
        }
        Ok(None)
    }
}

fn is_side_effect_function(name: &str) -> bool {
    SIDE_EFFECT_FUNCTIONS.contains(&name)
        || SIDE_EFFECT_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

fn statement_is_read_only(stmt: &Statement) -> bool {
    match stmt {
        Statement::Query(query) => query_is_read_only(query),
        // EXPLAIN ANALYZE executes the statement.
        Statement::Explain {
            analyze, statement, ..
        } => !*analyze && statement_is_read_only(statement),
        _ => false,
    }
}

fn query_is_read_only(query: &Query) -> bool {
    if !query.locks.is_empty() {
        return false;
    }
    if let Some(with) = &query.with
        && !with.cte_tables.iter().all(|cte| query_is_read_only(&cte.query))
    {
        return false;
    }
    set_expr_is_read_only(&query.body)
}

fn set_expr_is_read_only(body: &SetExpr) -> bool {
    match body {
        // SELECT ... INTO creates a table.
        SetExpr::Select(select) => select.into.is_none(),
        SetExpr::Values(_) | SetExpr::Table(_) => true,
        SetExpr::Query(query) => query_is_read_only(query),
        SetExpr::SetOperation { left, right, .. } => {
            set_expr_is_read_only(left) && set_expr_is_read_only(right)
        }
        _ => false,
    }
}

fn summarize(stmt: &Statement) -> String {
    let text = stmt.to_string();
    match text.char_indices().nth(80) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text,
    }
}
