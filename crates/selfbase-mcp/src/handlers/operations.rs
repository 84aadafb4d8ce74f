//! Operational tools: health and connection details.

use super::{ToolResult, to_json};
use crate::error::ToolError;
use crate::executor::ToolExecutor;
use serde_json::{Value, json};

pub(crate) async fn get_health(exec: &ToolExecutor, _args: Value) -> ToolResult {
    to_json(&exec.services.health.check().await)
}

pub(crate) async fn get_project_url(exec: &ToolExecutor, _args: Value) -> ToolResult {
    Ok(json!({ "url": exec.public_url }))
}

pub(crate) async fn get_anon_key(exec: &ToolExecutor, _args: Value) -> ToolResult {
    match &exec.anon_key {
        Some(key) => Ok(json!({ "anon_key": key })),
        None => Err(ToolError::Validation(
            "no anonymous key configured (set anon_key or the variable named by anon_key_env)"
                .to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{executor_for, executor_with};
    use selfbase_core::SelfbaseConfig;
    use selfbase_gateway::testing::ScriptedGateway;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_anon_key_required() {
        let exec = executor_with(Arc::new(ScriptedGateway::new()));
        let err = get_anon_key(&exec, json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[tokio::test]
    async fn test_project_url_prefers_public_url() {
        let config = SelfbaseConfig {
            api_url: "http://kong:8000".to_string(),
            public_url: Some("https://db.example.com".to_string()),
            anon_key: Some("anon".to_string()),
            anon_key_env: String::new(),
            ..Default::default()
        };
        let exec = executor_for(&config, Arc::new(ScriptedGateway::new()));

        let url = get_project_url(&exec, json!({})).await.unwrap();
        assert_eq!(url, json!({"url": "https://db.example.com"}));
        let key = get_anon_key(&exec, json!({})).await.unwrap();
        assert_eq!(key, json!({"anon_key": "anon"}));
    }
}
