//! SQL identifier and literal handling.
//!
//! Every dynamic identifier or literal that ends up inside a SQL string goes
//! through this module. The SQL gateway speaks plain query text over HTTP, so
//! there are no bind parameters to fall back on.

use thiserror::Error;

/// Schema backing the root branch.
pub const DEFAULT_BRANCH: &str = "public";

/// Schemas that are never reported as branches. Anything prefixed `pg_` is
/// excluded as well.
pub const RESERVED_SCHEMAS: &[&str] = &[
    "pg_catalog",
    "information_schema",
    "pg_toast",
    "pg_temp_1",
    "pg_toast_temp_1",
];

/// Errors raised while quoting identifiers or literals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentError {
    #[error("identifier must not be empty")]
    Empty,

    #[error("value contains a NUL byte: {0:?}")]
    Nul(String),
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
///
/// The mapping is lossy: `feature/x` and `feature-x` both become `feature_x`.
pub fn sanitize_identifier(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Quote an identifier for interpolation (`my"table` -> `"my""table"`).
pub fn quote_ident(ident: &str) -> Result<String, IdentError> {
    if ident.is_empty() {
        return Err(IdentError::Empty);
    }
    if ident.contains('\0') {
        return Err(IdentError::Nul(ident.to_string()));
    }
    Ok(format!("\"{}\"", ident.replace('"', "\"\"")))
}

/// Quote a string literal (`it's` -> `'it''s'`).
pub fn quote_literal(value: &str) -> Result<String, IdentError> {
    if value.contains('\0') {
        return Err(IdentError::Nul(value.to_string()));
    }
    Ok(format!("'{}'", value.replace('\'', "''")))
}

/// Sanitize then quote, for user-supplied branch names.
pub fn branch_ident(raw: &str) -> Result<String, IdentError> {
    quote_ident(&sanitize_identifier(raw))
}

/// Whether a schema is internal to Postgres and must be hidden from listings.
pub fn is_reserved_schema(name: &str) -> bool {
    name.starts_with("pg_") || RESERVED_SCHEMAS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_disallowed_characters() {
        assert_eq!(sanitize_identifier("feature/x"), "feature_x");
        assert_eq!(sanitize_identifier("a-b.c d"), "a_b_c_d");
        assert_eq!(sanitize_identifier("already_ok_42"), "already_ok_42");
        assert_eq!(sanitize_identifier("émoji🚀"), "_moji_");
    }

    #[test]
    fn test_sanitize_collisions_are_possible() {
        assert_eq!(sanitize_identifier("feature/x"), sanitize_identifier("feature-x"));
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("users").unwrap(), "\"users\"");
        assert_eq!(quote_ident("my\"table").unwrap(), "\"my\"\"table\"");
        assert_eq!(quote_ident(""), Err(IdentError::Empty));
    }

    #[test]
    fn test_quote_literal_escapes_single_quotes() {
        assert_eq!(quote_literal("100").unwrap(), "'100'");
        assert_eq!(quote_literal("it's").unwrap(), "'it''s'");
        assert!(quote_literal("bad\0").is_err());
    }

    #[test]
    fn test_branch_ident_sanitizes_before_quoting() {
        assert_eq!(branch_ident("feature/x").unwrap(), "\"feature_x\"");
        assert_eq!(branch_ident("x\";drop").unwrap(), "\"x__drop\"");
    }

    #[test]
    fn test_reserved_schemas() {
        for name in RESERVED_SCHEMAS {
            assert!(is_reserved_schema(name));
        }
        assert!(is_reserved_schema("pg_temp_7"));
        assert!(!is_reserved_schema("public"));
        assert!(!is_reserved_schema("feature_x"));
    }
}
