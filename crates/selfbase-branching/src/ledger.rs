//! Per-branch migration ledger.
//!
//! Each branch schema may hold a `schema_migrations(version, name)` table.
//! Versions are compared as text in byte order, which matches chronological
//! order only for equal-width timestamp versions. Reads sort in Rust (`String`
//! ordering is byte order) so the SQL stays within what the read-only check
//! parses; the truncating `DELETE` compares with `COLLATE "C"` server-side.

use crate::error::BranchError;
use selfbase_core::{quote_ident, quote_literal};
use selfbase_gateway::{SqlGateway, column_string};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Name of the ledger table inside each branch schema.
pub const LEDGER_TABLE: &str = "schema_migrations";

/// One applied migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub version: String,
    pub name: Option<String>,
}

/// Access to the ledger tables of branch schemas.
#[derive(Clone)]
pub struct MigrationLedger {
    gateway: Arc<dyn SqlGateway>,
}

impl MigrationLedger {
    pub fn new(gateway: Arc<dyn SqlGateway>) -> Self {
        Self { gateway }
    }

    fn table(schema: &str) -> Result<String, BranchError> {
        Ok(format!("{}.{}", quote_ident(schema)?, quote_ident(LEDGER_TABLE)?))
    }

    /// Ledger contents of `schema`, ordered by version.
    pub async fn entries(&self, schema: &str) -> Result<Vec<LedgerEntry>, BranchError> {
        let sql = format!(
            "SELECT version::text AS version, name FROM {}",
            Self::table(schema)?
        );
        let rows = self.gateway.execute(&sql, true).await?;
        Ok(sorted_entries(&rows))
    }

    /// Like [`entries`](Self::entries), but a missing ledger reads as empty.
    pub async fn entries_or_empty(&self, schema: &str) -> Result<Vec<LedgerEntry>, BranchError> {
        match self.entries(schema).await {
            Err(BranchError::Gateway(e)) if e.is_undefined_table() => {
                debug!(schema = %schema, "No migration ledger, treating as empty");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Entries present in `source` but absent from `target`.
    ///
    /// A missing ledger on either side yields an empty list rather than an
    /// error. Transport failures still propagate.
    pub async fn missing(
        &self,
        source: &str,
        target: &str,
    ) -> Result<Vec<LedgerEntry>, BranchError> {
        let sql = format!(
            "SELECT s.version::text AS version, s.name FROM {} s \
             WHERE s.version::text NOT IN (SELECT t.version::text FROM {} t)",
            Self::table(source)?,
            Self::table(target)?
        );
        match self.gateway.execute(&sql, true).await {
            Ok(rows) => Ok(sorted_entries(&rows)),
            Err(e) if e.is_undefined_table() => {
                debug!(source = %source, target = %target, error = %e, "Ledger missing, no migrations to compare");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete entries whose version sorts after `version`; returns them.
    pub async fn truncate_after(
        &self,
        schema: &str,
        version: &str,
    ) -> Result<Vec<String>, BranchError> {
        let sql = format!(
            "DELETE FROM {} WHERE version::text COLLATE \"C\" > {} RETURNING version::text AS version",
            Self::table(schema)?,
            quote_literal(version)?
        );
        let rows = self.gateway.execute(&sql, false).await?;
        let mut removed: Vec<String> = rows
            .iter()
            .filter_map(|row| column_string(row, "version"))
            .collect();
        removed.sort();
        Ok(removed)
    }

    /// Record a version. Returns `false` when it was already present.
    pub async fn record(
        &self,
        schema: &str,
        version: &str,
        name: Option<&str>,
    ) -> Result<bool, BranchError> {
        let name_sql = match name {
            Some(n) => quote_literal(n)?,
            None => "NULL".to_string(),
        };
        let sql = format!(
            "INSERT INTO {} (version, name) VALUES ({}, {}) ON CONFLICT DO NOTHING \
             RETURNING version::text AS version",
            Self::table(schema)?,
            quote_literal(version)?,
            name_sql
        );
        let rows = self.gateway.execute(&sql, false).await?;
        Ok(!rows.is_empty())
    }

    /// Create the ledger table in `schema` if it does not exist.
    pub async fn ensure(&self, schema: &str) -> Result<(), BranchError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (version text PRIMARY KEY, name text)",
            Self::table(schema)?
        );
        self.gateway.execute(&sql, false).await?;
        Ok(())
    }
}

/// Entries in byte order of their version.
fn sorted_entries(rows: &[selfbase_gateway::Row]) -> Vec<LedgerEntry> {
    let mut entries: Vec<LedgerEntry> = rows.iter().filter_map(entry_from_row).collect();
    entries.sort_by(|a, b| a.version.cmp(&b.version));
    entries
}

fn entry_from_row(row: &selfbase_gateway::Row) -> Option<LedgerEntry> {
    Some(LedgerEntry {
        version: column_string(row, "version")?,
        name: column_string(row, "name"),
    })
}
