//! SQL gateway configuration.
//!
//! Two gateways are supported:
//! 1. `http` - the platform's SQL query endpoint (pg-meta), reached through the
//!    API gateway with the service role key
//! 2. `postgres` - a direct connection pool, for setups that expose the
//!    database port to the adapter

use serde::{Deserialize, Serialize};

/// Which SQL gateway implementation to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    /// HTTP query endpoint (default).
    #[default]
    Http,
    /// Direct Postgres connection.
    Postgres,
}

/// Configuration for SQL execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlConfig {
    /// Gateway implementation.
    #[serde(default)]
    pub gateway: GatewayKind,

    /// Path of the query endpoint, relative to `api_url`.
    #[serde(default = "default_query_path")]
    pub query_path: String,

    /// Environment variable name containing the PostgreSQL connection URL.
    /// Highest precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url_env: Option<String>,

    /// Full PostgreSQL connection URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Connection pool configuration (postgres gateway only).
    #[serde(default)]
    pub pool: ConnectionPoolConfig,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayKind::default(),
            query_path: default_query_path(),
            database_url_env: None,
            database_url: None,
            pool: ConnectionPoolConfig::default(),
        }
    }
}

/// Connection pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionPoolConfig {
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Timeout in seconds when acquiring a connection.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_seconds: default_acquire_timeout(),
        }
    }
}

impl SqlConfig {
    /// Resolve the Postgres connection URL.
    ///
    /// Precedence:
    /// 1. database_url_env (environment variable)
    /// 2. database_url (direct URL)
    pub fn connection_string(&self) -> Option<String> {
        if let Some(env_var) = &self.database_url_env
            && let Ok(url) = std::env::var(env_var)
        {
            return Some(url);
        }
        self.database_url.clone()
    }
}

fn default_query_path() -> String {
    "/pg/query".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    30
}
