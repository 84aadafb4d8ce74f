//! Branch data types.

use crate::error::BranchError;
use selfbase_core::{DEFAULT_BRANCH, sanitize_identifier};
use serde::{Deserialize, Serialize};

/// Postgres truncates identifiers longer than this many bytes.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// A named environment materialized as a database schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub schema_name: String,
    pub is_default: bool,
    /// Branch this one was cloned from. Only known at creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_branch: Option<String>,
}

impl Branch {
    /// A branch backed by an existing schema.
    pub fn from_schema(schema_name: impl Into<String>) -> Self {
        let schema_name = schema_name.into();
        Self {
            name: schema_name.clone(),
            is_default: schema_name == DEFAULT_BRANCH,
            schema_name,
            parent_branch: None,
        }
    }
}

/// What happened to one parent table during branch creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyStatus {
    Copied,
    SkippedAlreadyExists,
    Failed,
}

/// Per-table result of copying a parent's table shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCopyOutcome {
    pub table: String,
    pub status: CopyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of `create`: the branch plus one outcome per parent table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchCreation {
    #[serde(flatten)]
    pub branch: Branch,
    pub tables: Vec<TableCopyOutcome>,
}

impl BranchCreation {
    /// Tables whose copy failed for a reason other than already existing.
    pub fn failed_tables(&self) -> impl Iterator<Item = &TableCopyOutcome> {
        self.tables.iter().filter(|t| t.status == CopyStatus::Failed)
    }
}

/// Map a user-supplied branch name onto its schema name.
pub fn schema_name_for(raw: &str, field: &str) -> Result<String, BranchError> {
    if raw.trim().is_empty() {
        return Err(BranchError::Validation(format!("{} must not be empty", field)));
    }
    let schema = sanitize_identifier(raw);
    if schema.len() > MAX_IDENTIFIER_LEN {
        return Err(BranchError::Validation(format!(
            "{} '{}' exceeds {} characters",
            field, raw, MAX_IDENTIFIER_LEN
        )));
    }
    Ok(schema)
}
