//! Direct Postgres SQL gateway.
//!
//! Runs statements on a sqlx pool with the simple query protocol, so that
//! multi-statement text (migrations) behaves like it does over HTTP.

use crate::error::{GatewayError, map_sqlx_error};
use crate::read_only::ReadOnlyAnalyzer;
use crate::{Row, SqlGateway};
use async_trait::async_trait;
use selfbase_core::ConnectionPoolConfig;
use serde_json::{Value, json};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Column, Executor as _, PgPool, Row as _};
use std::time::Duration;

/// SQL gateway backed by a Postgres connection pool.
#[derive(Clone)]
pub struct PostgresGateway {
    pool: PgPool,
    analyzer: ReadOnlyAnalyzer,
}

impl PostgresGateway {
    /// Connect a new pool.
    pub async fn connect(
        database_url: &str,
        pool: &ConnectionPoolConfig,
    ) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(pool.max_connections)
            .acquire_timeout(Duration::from_secs(pool.acquire_timeout_seconds))
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            analyzer: ReadOnlyAnalyzer::new(),
        }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn execute_read_only(&self, query: &str) -> Result<Vec<PgRow>, GatewayError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        let rows = (&mut *tx)
            .fetch_all(sqlx::raw_sql(query))
            .await
            .map_err(map_sqlx_error)?;
        tx.rollback().await.map_err(map_sqlx_error)?;
        Ok(rows)
    }
}

#[async_trait]
impl SqlGateway for PostgresGateway {
    async fn execute(&self, query: &str, read_only: bool) -> Result<Vec<Row>, GatewayError> {
        tracing::debug!(read_only, sql = %query, "Executing SQL on Postgres pool");

        let rows = if read_only {
            self.analyzer.ensure_read_only(query)?;
            self.execute_read_only(query).await?
        } else {
            (&self.pool)
                .fetch_all(sqlx::raw_sql(query))
                .await
                .map_err(map_sqlx_error)?
        };

        Ok(rows.iter().map(row_to_json).collect())
    }
}

/// Convert a sqlx row to a JSON object.
///
/// Types without a JSON mapping here come back as `null`; cast them to text
/// in the query when the value matters.
fn row_to_json(row: &PgRow) -> Row {
    let mut obj = Row::new();

    for col in row.columns() {
        let name = col.name();
        let idx = col.ordinal();

        let value: Value = if let Ok(v) = row.try_get::<Option<Value>, _>(idx) {
            v.unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            v.map(Value::String).unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            json!(v)
        } else if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            json!(v)
        } else if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
            json!(v)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            json!(v)
        } else if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
            json!(v)
        } else if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
            json!(v)
        } else if let Ok(v) = row.try_get::<Option<uuid::Uuid>, _>(idx) {
            json!(v.map(|u| u.to_string()))
        } else if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
            json!(v.map(|t| t.to_rfc3339()))
        } else if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
            json!(v.map(|t| t.to_string()))
        } else if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
            json!(v.map(|d| d.to_string()))
        } else if let Ok(v) = row.try_get::<Option<Vec<String>>, _>(idx) {
            json!(v)
        } else {
            Value::Null
        };

        obj.insert(name.to_string(), value);
    }

    obj
}
