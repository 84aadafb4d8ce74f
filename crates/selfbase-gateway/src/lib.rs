//! # selfbase-gateway
//!
//! The SQL execution gateway: the one seam through which every selfbase
//! component talks to the database.
//!
//! - [`HttpSqlGateway`] posts statements to the platform's query endpoint
//! - [`PostgresGateway`] runs them on a direct sqlx pool
//!
//! Both refuse statements submitted as read-only unless they parse as plain
//! queries. Failures are never retried.

pub mod error;
pub mod http;
pub mod postgres;
pub mod read_only;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

use async_trait::async_trait;
use selfbase_core::{GatewayKind, SelfbaseConfig};
use std::sync::Arc;
use std::time::Duration;

pub use error::GatewayError;
pub use http::HttpSqlGateway;
pub use postgres::PostgresGateway;
pub use read_only::ReadOnlyAnalyzer;

/// A result row: column name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Executes SQL text against the backend database.
#[async_trait]
pub trait SqlGateway: Send + Sync {
    /// Execute `query` and return the rows of its result.
    ///
    /// With `read_only`, statements that could modify the database are refused
    /// before anything is sent.
    async fn execute(&self, query: &str, read_only: bool) -> Result<Vec<Row>, GatewayError>;
}

/// Build the shared HTTP client used for every backend call.
pub fn build_http_client(config: &SelfbaseConfig) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds))
        .user_agent(concat!("selfbase/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| GatewayError::Unavailable(format!("failed to build HTTP client: {}", e)))
}

/// Construct the gateway selected by `config.sql.gateway`.
pub async fn connect(
    config: &SelfbaseConfig,
    client: reqwest::Client,
) -> Result<Arc<dyn SqlGateway>, GatewayError> {
    match config.sql.gateway {
        GatewayKind::Http => {
            let gateway = HttpSqlGateway::from_config(config, client);
            tracing::info!(endpoint = %gateway.endpoint(), "Using HTTP SQL gateway");
            Ok(Arc::new(gateway))
        }
        GatewayKind::Postgres => {
            let url = config.sql.connection_string().ok_or_else(|| {
                GatewayError::Unavailable("no database URL configured".to_string())
            })?;
            let gateway = PostgresGateway::connect(&url, &config.sql.pool).await?;
            tracing::info!(
                max_connections = config.sql.pool.max_connections,
                "Using direct Postgres SQL gateway"
            );
            Ok(Arc::new(gateway))
        }
    }
}

/// Read a column as a string, accepting numbers too (ledger versions may be
/// stored as text or bigint).
pub fn column_string(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_string() {
        let row = json!({"a": "x", "b": 17, "c": null})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(column_string(&row, "a").as_deref(), Some("x"));
        assert_eq!(column_string(&row, "b").as_deref(), Some("17"));
        assert_eq!(column_string(&row, "c"), None);
        assert_eq!(column_string(&row, "missing"), None);
    }

    #[tokio::test]
    async fn test_connect_http_gateway() {
        let config = SelfbaseConfig::default();
        let client = build_http_client(&config).unwrap();
        assert!(connect(&config, client).await.is_ok());
    }
}
