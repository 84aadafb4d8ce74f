//! Error types for branch operations.

use selfbase_core::IdentError;
use selfbase_gateway::GatewayError;
use thiserror::Error;

/// Errors that can occur in branch operations.
#[derive(Debug, Error)]
pub enum BranchError {
    /// Malformed input or an illegal operation. No SQL was issued.
    #[error("validation error: {0}")]
    Validation(String),

    /// The SQL gateway failed or rejected a statement.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl From<IdentError> for BranchError {
    fn from(err: IdentError) -> Self {
        BranchError::Validation(err.to_string())
    }
}

impl BranchError {
    /// Whether this is a validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, BranchError::Validation(_))
    }
}
