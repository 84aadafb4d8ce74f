//! Error types for the SQL gateway.

use thiserror::Error;

/// SQLSTATE for `duplicate_table`.
pub const SQLSTATE_DUPLICATE_TABLE: &str = "42P07";

/// SQLSTATE for `undefined_table`.
pub const SQLSTATE_UNDEFINED_TABLE: &str = "42P01";

/// Errors that can occur while executing SQL.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The gateway could not be reached (connection refused, timeout, TLS...).
    #[error("SQL gateway unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with an error. `message` is the raw backend text.
    #[error("{message}")]
    Rejected {
        /// HTTP status, when the gateway is HTTP based.
        status: Option<u16>,
        /// SQLSTATE, when the backend reported one.
        code: Option<String>,
        message: String,
    },

    /// A statement submitted as read-only would modify the database.
    #[error("statement is not read-only: {0}")]
    NotReadOnly(String),

    /// SQL submitted as read-only could not be parsed, so it cannot be vetted.
    #[error("failed to parse SQL: {0}")]
    Parse(String),

    /// The gateway answered with a body that is not a row set.
    #[error("unexpected gateway response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Build a rejection from a raw message.
    pub fn rejected(message: impl Into<String>) -> Self {
        GatewayError::Rejected {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// SQLSTATE carried by the error, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            GatewayError::Rejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Whether the backend refused because the relation already exists.
    pub fn is_already_exists(&self) -> bool {
        match self {
            GatewayError::Rejected { code, message, .. } => {
                code.as_deref() == Some(SQLSTATE_DUPLICATE_TABLE)
                    || message.contains("already exists")
            }
            _ => false,
        }
    }

    /// Whether the backend refused because a relation does not exist.
    pub fn is_undefined_table(&self) -> bool {
        match self {
            GatewayError::Rejected { code, message, .. } => {
                code.as_deref() == Some(SQLSTATE_UNDEFINED_TABLE)
                    || (message.contains("relation") && message.contains("does not exist"))
            }
            _ => false,
        }
    }

    /// Whether the error came from the caller's input rather than the backend.
    pub fn is_client_error(&self) -> bool {
        matches!(self, GatewayError::NotReadOnly(_) | GatewayError::Parse(_))
    }
}

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> GatewayError {
    match err {
        sqlx::Error::Database(db) => GatewayError::Rejected {
            status: None,
            code: db.code().map(|c| c.to_string()),
            message: db.message().to_string(),
        },
        e @ (sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed) => GatewayError::Unavailable(e.to_string()),
        other => GatewayError::rejected(other.to_string()),
    }
}
