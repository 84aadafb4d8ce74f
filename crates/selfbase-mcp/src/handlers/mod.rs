//! Tool handlers, one module per tool group.
//!
//! Each handler deserializes its own parameters (unknown fields such as
//! `project_id` are ignored here) and returns the JSON result of the call.

pub(crate) mod auth;
pub(crate) mod branching;
pub(crate) mod database;
pub(crate) mod functions;
pub(crate) mod operations;
pub(crate) mod storage;

use crate::error::ToolError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub(crate) type ToolResult = Result<Value, ToolError>;

/// Deserialize tool arguments into a parameter struct.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> ToolResult {
    Ok(serde_json::to_value(value)?)
}
