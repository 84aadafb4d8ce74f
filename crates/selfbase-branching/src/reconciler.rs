//! Branch reconciler: merge, reset and rebase over migration ledgers.
//!
//! All three operate on ledger bookkeeping. None of them replays migration
//! SQL against a branch, and none is wrapped in a transaction.

use crate::branch::schema_name_for;
use crate::error::BranchError;
use crate::ledger::MigrationLedger;
use selfbase_core::{DEFAULT_BRANCH, quote_ident};
use selfbase_gateway::SqlGateway;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    pub success: bool,
    /// Versions present in the source ledger and absent from the target.
    /// They are reported, not applied.
    pub migrations_applied: Vec<String>,
}

/// How a reset was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetMode {
    LedgerTruncated,
    SchemaRecreated,
}

/// Result of a reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetResult {
    pub branch: String,
    pub mode: ResetMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_versions: Option<Vec<String>>,
}

/// What happened to one version during a rebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertStatus {
    Inserted,
    AlreadyPresent,
    Failed,
}

/// Per-version result of a rebase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerInsertOutcome {
    pub version: String,
    pub status: InsertStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of a rebase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebaseResult {
    pub branch: String,
    pub target_branch: String,
    pub outcomes: Vec<LedgerInsertOutcome>,
}

impl RebaseResult {
    /// Number of versions newly recorded.
    pub fn inserted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == InsertStatus::Inserted)
            .count()
    }
}

/// Computes and records ledger differences between branches.
#[derive(Clone)]
pub struct BranchReconciler {
    gateway: Arc<dyn SqlGateway>,
    ledger: MigrationLedger,
}

impl BranchReconciler {
    pub fn new(gateway: Arc<dyn SqlGateway>) -> Self {
        Self {
            ledger: MigrationLedger::new(gateway.clone()),
            gateway,
        }
    }

    /// Versions the target is missing from the source.
    ///
    /// Compute-only: the target ledger and schema are left untouched, even
    /// though the result field is called `migrations_applied`.
    pub async fn merge(
        &self,
        source_branch: &str,
        target_branch: Option<&str>,
    ) -> Result<MergeResult, BranchError> {
        let source = schema_name_for(source_branch, "source_branch")?;
        let target = schema_name_for(target_branch.unwrap_or(DEFAULT_BRANCH), "target_branch")?;

        let missing = self.ledger.missing(&source, &target).await?;
        let versions: Vec<String> = missing.into_iter().map(|e| e.version).collect();

        if !versions.is_empty() {
            warn!(
                source = %source,
                target = %target,
                count = versions.len(),
                "Merge reports migrations missing from target without applying them"
            );
        }

        Ok(MergeResult {
            success: true,
            migrations_applied: versions,
        })
    }

    /// Roll a branch back.
    ///
    /// With a version, ledger rows sorting after it are deleted (table
    /// structures and data are not reverted). Without one, the schema is
    /// dropped and recreated empty, which is refused for `public`.
    pub async fn reset(
        &self,
        branch_name: &str,
        migration_version: Option<&str>,
    ) -> Result<ResetResult, BranchError> {
        let schema = schema_name_for(branch_name, "branch_name")?;

        match migration_version {
            Some(version) => {
                if version.is_empty() {
                    return Err(BranchError::Validation(
                        "migration_version must not be empty".to_string(),
                    ));
                }
                let removed = self.ledger.truncate_after(&schema, version).await?;
                info!(branch = %schema, version = %version, removed = removed.len(), "Reset branch ledger");
                Ok(ResetResult {
                    branch: schema,
                    mode: ResetMode::LedgerTruncated,
                    removed_versions: Some(removed),
                })
            }
            None => {
                if schema == DEFAULT_BRANCH {
                    return Err(BranchError::Validation(
                        "refusing to recreate the default branch 'public'; pass migration_version to reset its ledger"
                            .to_string(),
                    ));
                }
                let ident = quote_ident(&schema)?;
                self.gateway
                    .execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", ident), false)
                    .await?;
                self.gateway
                    .execute(&format!("CREATE SCHEMA {}", ident), false)
                    .await?;
                info!(branch = %schema, "Recreated branch schema");
                Ok(ResetResult {
                    branch: schema,
                    mode: ResetMode::SchemaRecreated,
                    removed_versions: None,
                })
            }
        }
    }

    /// Record in `branch_name`'s ledger every version the target has and the
    /// branch lacks. Each insert is independent; failures are reported per
    /// version and do not stop the rest.
    pub async fn rebase(
        &self,
        branch_name: &str,
        target_branch: Option<&str>,
    ) -> Result<RebaseResult, BranchError> {
        let branch = schema_name_for(branch_name, "branch_name")?;
        let target = schema_name_for(target_branch.unwrap_or(DEFAULT_BRANCH), "target_branch")?;

        let missing = self.ledger.missing(&target, &branch).await?;
        let mut outcomes = Vec::with_capacity(missing.len());

        for entry in missing {
            let outcome = match self
                .ledger
                .record(&branch, &entry.version, entry.name.as_deref())
                .await
            {
                Ok(true) => LedgerInsertOutcome {
                    version: entry.version,
                    status: InsertStatus::Inserted,
                    reason: None,
                },
                Ok(false) => LedgerInsertOutcome {
                    version: entry.version,
                    status: InsertStatus::AlreadyPresent,
                    reason: None,
                },
                Err(e) => {
                    warn!(branch = %branch, version = %entry.version, error = %e, "Failed to record version");
                    LedgerInsertOutcome {
                        version: entry.version,
                        status: InsertStatus::Failed,
                        reason: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let result = RebaseResult {
            branch,
            target_branch: target,
            outcomes,
        };
        info!(
            branch = %result.branch,
            target = %result.target_branch,
            inserted = result.inserted(),
            "Rebased branch ledger"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selfbase_gateway::GatewayError;
    use selfbase_gateway::testing::ScriptedGateway;
    use serde_json::json;

    #[tokio::test]
    async fn test_merge_is_compute_only() {
        let gateway = Arc::new(ScriptedGateway::new().on(
            "NOT IN",
            vec![json!({"version": "1700000000001", "name": "a"})],
        ));
        let reconciler = BranchReconciler::new(gateway.clone());

        let result = reconciler.merge("feature/x", None).await.unwrap();
        assert!(result.success);
        assert_eq!(result.migrations_applied, vec!["1700000000001"]);

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls.iter().all(|c| c.read_only));
        assert!(calls[0].query.contains("\"feature_x\".\"schema_migrations\" s"));
        assert!(calls[0].query.contains("\"public\".\"schema_migrations\" t"));
    }

    #[tokio::test]
    async fn test_merge_without_ledgers_is_empty_success() {
        let gateway = Arc::new(ScriptedGateway::new().fail_on(
            "NOT IN",
            GatewayError::rejected("relation \"feature_x.schema_migrations\" does not exist"),
        ));
        let result = BranchReconciler::new(gateway).merge("feature_x", Some("public")).await.unwrap();
        assert!(result.success);
        assert!(result.migrations_applied.is_empty());
    }

    #[tokio::test]
    async fn test_reset_with_version_truncates_ledger_only() {
        let gateway = Arc::new(ScriptedGateway::new().on("DELETE FROM", vec![json!({"version": "2"})]));
        let result = BranchReconciler::new(gateway.clone())
            .reset("dev", Some("100"))
            .await
            .unwrap();
        assert_eq!(result.mode, ResetMode::LedgerTruncated);
        assert_eq!(result.removed_versions, Some(vec!["2".to_string()]));

        let queries = gateway.queries();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].contains("> '100'"));
    }

    #[tokio::test]
    async fn test_reset_without_version_recreates_schema() {
        let gateway = Arc::new(ScriptedGateway::new());
        let result = BranchReconciler::new(gateway.clone())
            .reset("feature/x", None)
            .await
            .unwrap();
        assert_eq!(result.mode, ResetMode::SchemaRecreated);
        assert_eq!(
            gateway.queries(),
            vec![
                "DROP SCHEMA IF EXISTS \"feature_x\" CASCADE",
                "CREATE SCHEMA \"feature_x\""
            ]
        );
    }

    #[tokio::test]
    async fn test_reset_public_without_version_is_refused() {
        let gateway = Arc::new(ScriptedGateway::new());
        let err = BranchReconciler::new(gateway.clone())
            .reset("public", None)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rebase_records_missing_versions() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .on(
                    "NOT IN",
                    vec![
                        json!({"version": "1", "name": "init"}),
                        json!({"version": "2", "name": null}),
                        json!({"version": "3", "name": null}),
                    ],
                )
                .on("VALUES ('1'", vec![json!({"version": "1"})])
                .on("VALUES ('2'", vec![])
                .fail_on("VALUES ('3'", GatewayError::rejected("permission denied")),
        );
        let result = BranchReconciler::new(gateway.clone())
            .rebase("dev", None)
            .await
            .unwrap();

        let statuses: Vec<_> = result.outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![InsertStatus::Inserted, InsertStatus::AlreadyPresent, InsertStatus::Failed]
        );
        assert_eq!(result.inserted(), 1);
        assert_eq!(result.outcomes[2].reason.as_deref(), Some("permission denied"));

        // Diff direction: target ledger minus branch ledger.
        let queries = gateway.queries();
        assert!(queries[0].contains("FROM \"public\".\"schema_migrations\" s"));
        assert!(queries[0].contains("FROM \"dev\".\"schema_migrations\" t"));
        assert!(queries[1].contains("INSERT INTO \"dev\".\"schema_migrations\""));
        assert!(queries[1].contains("'init'"));
    }

    #[tokio::test]
    async fn test_rebase_with_nothing_missing_inserts_nothing() {
        let gateway = Arc::new(ScriptedGateway::new());
        let result = BranchReconciler::new(gateway.clone())
            .rebase("dev", Some("staging"))
            .await
            .unwrap();
        assert!(result.outcomes.is_empty());
        assert_eq!(gateway.call_count(), 1);
    }
}
