//! Database tools: raw SQL, catalog listings and migrations.

use super::{ToolResult, parse_args, to_json};
use crate::error::ToolError;
use crate::executor::ToolExecutor;
use chrono::Utc;
use selfbase_branching::schema_name_for;
use selfbase_core::{DEFAULT_BRANCH, quote_ident, quote_literal};
use selfbase_gateway::Row;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct ExecuteSqlParams {
    query: String,
    #[serde(default)]
    read_only: bool,
}

#[derive(Debug, Deserialize)]
struct ListTablesParams {
    schemas: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ListMigrationsParams {
    branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApplyMigrationParams {
    name: String,
    query: String,
    branch: Option<String>,
}

fn rows_to_json(rows: Vec<Row>) -> Value {
    Value::Array(rows.into_iter().map(Value::Object).collect())
}

pub(crate) async fn execute_sql(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: ExecuteSqlParams = parse_args(args)?;
    let rows = exec.gateway.execute(&params.query, params.read_only).await?;
    Ok(rows_to_json(rows))
}

pub(crate) async fn list_tables(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: ListTablesParams = parse_args(args)?;
    let schemas = params
        .schemas
        .unwrap_or_else(|| vec![DEFAULT_BRANCH.to_string()]);
    if schemas.is_empty() {
        return Err(ToolError::Validation("schemas must not be empty".to_string()));
    }
    let schema_list = schemas
        .iter()
        .map(|s| quote_literal(s))
        .collect::<Result<Vec<_>, _>>()?
        .join(", ");

    let sql = format!(
        "SELECT n.nspname AS schema, c.relname AS name, \
         c.reltuples::bigint AS estimated_rows, \
         (SELECT count(*) FROM pg_attribute a \
          WHERE a.attrelid = c.oid AND a.attnum > 0 AND NOT a.attisdropped) AS column_count, \
         obj_description(c.oid, 'pg_class') AS comment \
         FROM pg_class c JOIN pg_namespace n ON n.oid = c.relnamespace \
         WHERE c.relkind IN ('r', 'p') AND n.nspname IN ({}) \
         ORDER BY n.nspname, c.relname",
        schema_list
    );
    Ok(rows_to_json(exec.gateway.execute(&sql, true).await?))
}

pub(crate) async fn list_extensions(exec: &ToolExecutor, _args: Value) -> ToolResult {
    let sql = "SELECT e.extname AS name, n.nspname AS schema, e.extversion AS version \
               FROM pg_extension e JOIN pg_namespace n ON n.oid = e.extnamespace \
               ORDER BY e.extname";
    Ok(rows_to_json(exec.gateway.execute(sql, true).await?))
}

pub(crate) async fn list_migrations(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: ListMigrationsParams = parse_args(args)?;
    let schema = schema_name_for(params.branch.as_deref().unwrap_or(DEFAULT_BRANCH), "branch")?;
    to_json(&exec.branching.ledger.entries_or_empty(&schema).await?)
}

/// Run migration SQL with the branch first on the search path, then record it.
///
/// `set_config(..., true)` scopes the search path to the statement batch, so
/// pooled connections do not keep it.
pub(crate) async fn apply_migration(exec: &ToolExecutor, args: Value) -> ToolResult {
    let params: ApplyMigrationParams = parse_args(args)?;
    let schema = schema_name_for(params.branch.as_deref().unwrap_or(DEFAULT_BRANCH), "branch")?;
    let ledger = &exec.branching.ledger;

    ledger.ensure(&schema).await?;

    let search_path = if schema == DEFAULT_BRANCH {
        quote_ident(&schema)?
    } else {
        format!("{}, {}", quote_ident(&schema)?, quote_ident(DEFAULT_BRANCH)?)
    };
    let sql = format!(
        "SELECT set_config('search_path', {}, true);\n{}",
        quote_literal(&search_path)?,
        params.query
    );
    exec.gateway.execute(&sql, false).await?;

    let version = Utc::now().timestamp_millis().to_string();
    let recorded = ledger.record(&schema, &version, Some(&params.name)).await?;
    if recorded {
        info!(branch = %schema, version = %version, name = %params.name, "Applied migration");
    } else {
        warn!(branch = %schema, version = %version, "Migration ran but its version was already recorded");
    }

    Ok(json!({
        "version": version,
        "name": params.name,
        "branch": schema,
    }))
}
