//! CLI command implementations for the selfbase MCP server.

pub mod check;
pub mod serve;
pub mod tools;

use anyhow::{Context, Result};
use selfbase_core::SelfbaseConfig;
use std::path::Path;
use tracing::warn;

/// Load `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<SelfbaseConfig> {
    if path.exists() {
        SelfbaseConfig::from_file(path)
            .with_context(|| format!("Failed to load config file: {:?}", path))
    } else {
        warn!(config = %path.display(), "Config file not found, using defaults");
        Ok(SelfbaseConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selfbase_core::{GatewayKind, Transport};
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.mcp.transport, Transport::Stdio);
    }

    #[test]
    fn test_loads_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api_url: http://kong:8000\nsql:\n  gateway: http\nmcp:\n  transport: http\n  port: 4000"
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.api_url, "http://kong:8000");
        assert_eq!(config.sql.gateway, GatewayKind::Http);
        assert!(config.mcp.is_http());
        assert_eq!(config.mcp.port, 4000);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_url: ftp://nope").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("api_url"));
    }
}
