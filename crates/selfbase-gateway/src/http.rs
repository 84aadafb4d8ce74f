//! HTTP SQL gateway.
//!
//! Sends statements to the platform's query endpoint (`POST /pg/query` behind
//! the API gateway) with the service role key as bearer credential. The
//! endpoint answers with a JSON array of row objects, or a JSON error body.

use crate::error::GatewayError;
use crate::read_only::ReadOnlyAnalyzer;
use crate::{Row, SqlGateway};
use async_trait::async_trait;
use reqwest::Client;
use selfbase_core::SelfbaseConfig;
use serde_json::{Value, json};
use std::fmt;

/// SQL gateway backed by the HTTP query endpoint.
#[derive(Clone)]
pub struct HttpSqlGateway {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    analyzer: ReadOnlyAnalyzer,
}

impl fmt::Debug for HttpSqlGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSqlGateway")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl HttpSqlGateway {
    /// Create a gateway for an explicit endpoint URL.
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            analyzer: ReadOnlyAnalyzer::new(),
        }
    }

    /// Create a gateway from the platform configuration.
    pub fn from_config(config: &SelfbaseConfig, client: Client) -> Self {
        Self::new(
            client,
            config.endpoint(&config.sql.query_path),
            config.service_role_key(),
        )
    }

    /// The query endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SqlGateway for HttpSqlGateway {
    async fn execute(&self, query: &str, read_only: bool) -> Result<Vec<Row>, GatewayError> {
        if read_only {
            self.analyzer.ensure_read_only(query)?;
        }

        tracing::debug!(endpoint = %self.endpoint, read_only, sql = %query, "Executing SQL");

        let mut request = self.client.post(&self.endpoint).json(&json!({ "query": query }));
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(rejection_from_body(status.as_u16(), &body));
        }

        parse_rows(&body)
    }
}

/// Turn an error body into a rejection, keeping the backend's own text.
fn rejection_from_body(status: u16, body: &str) -> GatewayError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| {
            ["error", "message", "msg"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()))
        })
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("SQL gateway returned HTTP {}", status)
            } else {
                body.trim().to_string()
            }
        });
    let code = parsed
        .as_ref()
        .and_then(|v| v.get("code"))
        .and_then(|c| c.as_str())
        .map(str::to_string);

    GatewayError::Rejected {
        status: Some(status),
        code,
        message,
    }
}

fn parse_rows(body: &str) -> Result<Vec<Row>, GatewayError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value =
        serde_json::from_str(body).map_err(|e| GatewayError::Decode(e.to_string()))?;
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                other => Err(GatewayError::Decode(format!(
                    "expected row object, got {}",
                    other
                ))),
            })
            .collect(),
        other => Err(GatewayError::Decode(format!(
            "expected an array of rows, got {}",
            other
        ))),
    }
}
