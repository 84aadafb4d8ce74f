//! Configuration types for selfbase.
//!
//! Configuration is loaded from a single YAML file (`selfbase.yaml`) into
//! [`SelfbaseConfig`], which is built once at startup and handed to every
//! component that talks to the backend.
//!
//! # Secrets
//!
//! Keys can be given inline, but the `*_env` fields are preferred: they name
//! an environment variable that takes precedence over the inline value.

pub mod mcp;
pub mod sql;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use mcp::{McpConfig, Transport};
pub use sql::{ConnectionPoolConfig, GatewayKind, SqlConfig};

/// Complete selfbase configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfbaseConfig {
    /// Project identifier reported by tools. Informational on a single
    /// self-hosted deployment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Base URL of the platform's API gateway, e.g. `http://localhost:8000`.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// URL handed out to clients by `get_project_url`. Defaults to `api_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    /// Service role key forwarded as bearer credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_role_key: Option<String>,

    /// Environment variable containing the service role key.
    #[serde(default = "default_service_role_key_env")]
    pub service_role_key_env: String,

    /// Anonymous (publishable) key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,

    /// Environment variable containing the anonymous key.
    #[serde(default = "default_anon_key_env")]
    pub anon_key_env: String,

    /// Timeout applied to every backend HTTP request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// SQL gateway settings.
    #[serde(default)]
    pub sql: SqlConfig,

    /// Edge function settings.
    #[serde(default)]
    pub functions: FunctionsConfig,

    /// MCP server settings.
    #[serde(default)]
    pub mcp: McpConfig,
}

impl Default for SelfbaseConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            api_url: default_api_url(),
            public_url: None,
            service_role_key: None,
            service_role_key_env: default_service_role_key_env(),
            anon_key: None,
            anon_key_env: default_anon_key_env(),
            request_timeout_seconds: default_request_timeout(),
            sql: SqlConfig::default(),
            functions: FunctionsConfig::default(),
            mcp: McpConfig::default(),
        }
    }
}

/// Edge function settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionsConfig {
    /// Directory mounted into the edge runtime, one sub-directory per function.
    #[serde(default = "default_functions_dir")]
    pub directory: PathBuf,

    /// Entrypoint file name inside each function directory.
    #[serde(default = "default_entrypoint")]
    pub entrypoint: String,
}

impl Default for FunctionsConfig {
    fn default() -> Self {
        Self {
            directory: default_functions_dir(),
            entrypoint: default_entrypoint(),
        }
    }
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SelfbaseConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;

        // Relative function directories are resolved against the config file.
        if config.functions.directory.is_relative()
            && let Some(base_dir) = path.parent()
            && !base_dir.as_os_str().is_empty()
        {
            config.functions.directory = base_dir.join(&config.functions.directory);
        }

        Ok(config)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot possibly reach a backend.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::Config(format!(
                "api_url must be an http(s) URL, got '{}'",
                self.api_url
            )));
        }
        if self.sql.gateway == GatewayKind::Postgres && self.sql.connection_string().is_none() {
            return Err(ConfigError::Config(
                "sql.gateway is 'postgres' but neither sql.database_url nor sql.database_url_env is set"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Service role key, checking the environment variable first.
    pub fn service_role_key(&self) -> Option<String> {
        secret_from(&self.service_role_key_env, &self.service_role_key)
    }

    /// Anonymous key, checking the environment variable first.
    pub fn anon_key(&self) -> Option<String> {
        secret_from(&self.anon_key_env, &self.anon_key)
    }

    /// URL reported to clients.
    pub fn public_url(&self) -> &str {
        self.public_url.as_deref().unwrap_or(&self.api_url)
    }

    /// Join a path onto the API base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn secret_from(env_var: &str, inline: &Option<String>) -> Option<String> {
    if !env_var.is_empty()
        && let Ok(value) = std::env::var(env_var)
        && !value.is_empty()
    {
        return Some(value);
    }
    inline.clone()
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_service_role_key_env() -> String {
    "SERVICE_ROLE_KEY".to_string()
}

fn default_anon_key_env() -> String {
    "ANON_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_functions_dir() -> PathBuf {
    PathBuf::from("volumes/functions")
}

fn default_entrypoint() -> String {
    "index.ts".to_string()
}
