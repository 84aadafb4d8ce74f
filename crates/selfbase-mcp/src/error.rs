//! Error types for the MCP crate.

use selfbase_branching::BranchError;
use selfbase_core::IdentError;
use selfbase_gateway::GatewayError;
use selfbase_services::ServiceError;
use thiserror::Error;

/// Errors that can occur in the MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    /// Failed to start the server.
    #[error("failed to start MCP server: {0}")]
    StartupFailed(String),

    /// Transport error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failure of a single tool call. Reported to the client as an `isError`
/// result, never as a JSON-RPC error.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Branch(#[from] BranchError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<IdentError> for ToolError {
    fn from(e: IdentError) -> Self {
        ToolError::Validation(e.to_string())
    }
}
