//! Branch repository: branches are schemas, nothing else is persisted.

use crate::branch::{Branch, BranchCreation, CopyStatus, TableCopyOutcome, schema_name_for};
use crate::error::BranchError;
use selfbase_core::ident::RESERVED_SCHEMAS;
use selfbase_core::{DEFAULT_BRANCH, is_reserved_schema, quote_ident, quote_literal};
use selfbase_gateway::{SqlGateway, column_string};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// CRUD over branch schemas.
#[derive(Clone)]
pub struct BranchRepository {
    gateway: Arc<dyn SqlGateway>,
}

impl BranchRepository {
    pub fn new(gateway: Arc<dyn SqlGateway>) -> Self {
        Self { gateway }
    }

    /// All user schemas, ordered by name.
    pub async fn list(&self) -> Result<Vec<Branch>, BranchError> {
        let reserved = RESERVED_SCHEMAS
            .iter()
            .map(|s| quote_literal(s))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");
        let sql = format!(
            "SELECT schema_name FROM information_schema.schemata \
             WHERE schema_name NOT IN ({}) AND schema_name NOT LIKE 'pg\\_%' \
             ORDER BY schema_name",
            reserved
        );

        let rows = self.gateway.execute(&sql, true).await?;
        let mut schemas: Vec<String> = rows
            .iter()
            .filter_map(|row| column_string(row, "schema_name"))
            .filter(|name| !is_reserved_schema(name))
            .collect();
        schemas.sort();

        Ok(schemas.into_iter().map(Branch::from_schema).collect())
    }

    /// Create a branch by cloning the table shapes of `parent_branch`.
    ///
    /// Not atomic: tables are copied one by one, and a failing table never
    /// stops the remaining ones. Each table's fate is reported.
    pub async fn create(
        &self,
        name: &str,
        parent_branch: Option<&str>,
    ) -> Result<BranchCreation, BranchError> {
        let parent_raw = parent_branch.unwrap_or(DEFAULT_BRANCH);
        let schema = schema_name_for(name, "name")?;
        let parent = schema_name_for(parent_raw, "parent_branch")?;
        let schema_ident = quote_ident(&schema)?;
        let parent_ident = quote_ident(&parent)?;

        info!(branch = %schema, parent = %parent, "Creating branch");
        self.gateway
            .execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema_ident), false)
            .await?;

        let tables_sql = format!(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = {} AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
            quote_literal(&parent)?
        );
        let tables: Vec<String> = self
            .gateway
            .execute(&tables_sql, true)
            .await?
            .iter()
            .filter_map(|row| column_string(row, "table_name"))
            .collect();

        let mut outcomes = Vec::with_capacity(tables.len());
        for table in tables {
            let table_ident = quote_ident(&table)?;
            let sql = format!(
                "CREATE TABLE {}.{} (LIKE {}.{} INCLUDING ALL)",
                schema_ident, table_ident, parent_ident, table_ident
            );
            let outcome = match self.gateway.execute(&sql, false).await {
                Ok(_) => TableCopyOutcome {
                    table,
                    status: CopyStatus::Copied,
                    reason: None,
                },
                Err(e) if e.is_already_exists() => {
                    debug!(branch = %schema, table = %table, "Table already exists, skipping");
                    TableCopyOutcome {
                        table,
                        status: CopyStatus::SkippedAlreadyExists,
                        reason: None,
                    }
                }
                Err(e) => {
                    warn!(branch = %schema, table = %table, error = %e, "Failed to copy table");
                    TableCopyOutcome {
                        table,
                        status: CopyStatus::Failed,
                        reason: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        Ok(BranchCreation {
            branch: Branch {
                name: name.to_string(),
                is_default: schema == DEFAULT_BRANCH,
                schema_name: schema,
                parent_branch: Some(parent_raw.to_string()),
            },
            tables: outcomes,
        })
    }

    /// Drop a branch schema and everything in it. Irreversible.
    pub async fn delete(&self, name: &str) -> Result<String, BranchError> {
        if name == DEFAULT_BRANCH {
            return Err(BranchError::Validation(
                "cannot delete the default branch 'public'".to_string(),
            ));
        }
        let schema = schema_name_for(name, "branch_name")?;
        if schema == DEFAULT_BRANCH {
            return Err(BranchError::Validation(format!(
                "branch '{}' resolves to the default branch 'public' and cannot be deleted",
                name
            )));
        }
        if is_reserved_schema(&schema) {
            return Err(BranchError::Validation(format!(
                "'{}' is a system schema, not a branch",
                schema
            )));
        }

        info!(branch = %schema, "Deleting branch");
        self.gateway
            .execute(&format!("DROP SCHEMA {} CASCADE", quote_ident(&schema)?), false)
            .await?;
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selfbase_gateway::GatewayError;
    use selfbase_gateway::testing::ScriptedGateway;
    use serde_json::json;

    fn repo(gateway: &Arc<ScriptedGateway>) -> BranchRepository {
        BranchRepository::new(gateway.clone())
    }

    #[tokio::test]
    async fn test_list_filters_reserved_and_sorts() {
        let gateway = Arc::new(ScriptedGateway::new().on(
            "information_schema.schemata",
            vec![
                json!({"schema_name": "public"}),
                json!({"schema_name": "pg_temp_3"}),
                json!({"schema_name": "information_schema"}),
                json!({"schema_name": "feature_x"}),
                json!({"schema_name": "auth"}),
            ],
        ));

        let branches = repo(&gateway).list().await.unwrap();
        let names: Vec<_> = branches.iter().map(|b| b.schema_name.as_str()).collect();
        assert_eq!(names, vec!["auth", "feature_x", "public"]);
        assert!(branches.iter().find(|b| b.name == "public").unwrap().is_default);
        assert!(!branches.iter().find(|b| b.name == "feature_x").unwrap().is_default);

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].read_only);
        assert!(calls[0].query.contains("'pg_toast_temp_1'"));
        assert!(calls[0].query.contains("NOT LIKE 'pg\\_%'"));
    }

    #[tokio::test]
    async fn test_create_sanitizes_and_copies_tables() {
        let gateway = Arc::new(ScriptedGateway::new().on(
            "information_schema.tables",
            vec![json!({"table_name": "posts"}), json!({"table_name": "users"})],
        ));

        let created = repo(&gateway).create("feature/x", None).await.unwrap();
        assert_eq!(created.branch.name, "feature/x");
        assert_eq!(created.branch.schema_name, "feature_x");
        assert_eq!(created.branch.parent_branch.as_deref(), Some("public"));
        assert!(!created.branch.is_default);
        assert_eq!(created.tables.len(), 2);
        assert!(created.tables.iter().all(|t| t.status == CopyStatus::Copied));

        let queries = gateway.queries();
        assert_eq!(queries[0], "CREATE SCHEMA IF NOT EXISTS \"feature_x\"");
        assert!(queries[1].contains("table_schema = 'public'"));
        assert_eq!(
            queries[2],
            "CREATE TABLE \"feature_x\".\"posts\" (LIKE \"public\".\"posts\" INCLUDING ALL)"
        );
        assert_eq!(
            queries[3],
            "CREATE TABLE \"feature_x\".\"users\" (LIKE \"public\".\"users\" INCLUDING ALL)"
        );
    }

    #[tokio::test]
    async fn test_create_reports_per_table_outcomes_and_continues() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .on(
                    "information_schema.tables",
                    vec![
                        json!({"table_name": "a"}),
                        json!({"table_name": "b"}),
                        json!({"table_name": "c"}),
                    ],
                )
                .fail_on(
                    "\"dev\".\"a\"",
                    GatewayError::Rejected {
                        status: Some(400),
                        code: Some("42P07".into()),
                        message: "relation \"a\" already exists".into(),
                    },
                )
                .fail_on("\"dev\".\"b\"", GatewayError::rejected("permission denied")),
        );

        let created = repo(&gateway).create("dev", Some("staging")).await.unwrap();
        let statuses: Vec<_> = created.tables.iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![
                CopyStatus::SkippedAlreadyExists,
                CopyStatus::Failed,
                CopyStatus::Copied
            ]
        );
        assert_eq!(created.tables[1].reason.as_deref(), Some("permission denied"));
        assert_eq!(created.failed_tables().count(), 1);
        assert!(gateway.queries()[1].contains("table_schema = 'staging'"));
    }

    #[tokio::test]
    async fn test_create_quotes_hostile_table_names() {
        let gateway = Arc::new(ScriptedGateway::new().on(
            "information_schema.tables",
            vec![json!({"table_name": "x\"; DROP SCHEMA public; --"})],
        ));

        repo(&gateway).create("dev", None).await.unwrap();
        assert_eq!(
            gateway.queries()[2],
            "CREATE TABLE \"dev\".\"x\"\"; DROP SCHEMA public; --\" \
             (LIKE \"public\".\"x\"\"; DROP SCHEMA public; --\" INCLUDING ALL)"
        );
    }

    #[tokio::test]
    async fn test_create_schema_failure_propagates() {
        let gateway = Arc::new(
            ScriptedGateway::new().fail_on("CREATE SCHEMA", GatewayError::Unavailable("down".into())),
        );
        let err = repo(&gateway).create("dev", None).await.unwrap_err();
        assert!(matches!(err, BranchError::Gateway(GatewayError::Unavailable(_))));
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_public_issues_no_sql() {
        let gateway = Arc::new(ScriptedGateway::new());
        let err = repo(&gateway).delete("public").await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_refuses_system_schemas() {
        let gateway = Arc::new(ScriptedGateway::new());
        assert!(repo(&gateway).delete("information_schema").await.unwrap_err().is_validation());
        assert!(repo(&gateway).delete("pg_catalog").await.unwrap_err().is_validation());
        assert!(repo(&gateway).delete("").await.unwrap_err().is_validation());
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_drops_sanitized_schema() {
        let gateway = Arc::new(ScriptedGateway::new());
        let schema = repo(&gateway).delete("feature/x").await.unwrap();
        assert_eq!(schema, "feature_x");
        assert_eq!(gateway.queries(), vec!["DROP SCHEMA \"feature_x\" CASCADE"]);
    }

    #[tokio::test]
    async fn test_catalog_reads_pass_read_only_check() {
        // Unscripted gateway: a read-only statement the check refuses would
        // surface as an error here.
        let gateway = Arc::new(ScriptedGateway::new());

        repo(&gateway).list().await.unwrap();
        repo(&gateway).create("dev", Some("staging")).await.unwrap();

        let reads: Vec<_> = gateway.calls().into_iter().filter(|c| c.read_only).collect();
        assert_eq!(reads.len(), 2);
        assert!(reads[1].query.contains("information_schema.tables"));
    }
}
