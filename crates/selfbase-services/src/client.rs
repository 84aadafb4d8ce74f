//! Shared HTTP client for the platform's services behind the API gateway.
//!
//! Every request carries the service role key twice, as the `apikey` header
//! the gateway routes on and as the bearer credential the service checks.

use crate::error::ServiceError;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use selfbase_core::SelfbaseConfig;
use serde_json::Value;
use std::fmt;

/// Authenticated client rooted at the API gateway URL.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ApiClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Client for the configured API gateway, authenticated as service role.
    pub fn from_config(config: &SelfbaseConfig, http: Client) -> Self {
        Self::new(http, config.api_url.clone(), config.service_role_key())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a gateway path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request with credentials attached.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, self.url(path));
        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    /// Send a request with an optional JSON body and decode the JSON answer.
    ///
    /// Empty bodies decode as `null`; non-JSON bodies come back as strings.
    pub async fn json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ServiceError> {
        let (status, text) = self.send(method, path, body).await?;
        if !status.is_success() {
            return Err(rejection(status, &text));
        }
        Ok(decode_body(&text))
    }

    /// Send a request and return status and raw body, whatever the status.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, String), ServiceError> {
        tracing::debug!(method = %method, path = %path, "Calling backend service");
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }

    pub async fn get(&self, path: &str) -> Result<Value, ServiceError> {
        self.json(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ServiceError> {
        self.json(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, ServiceError> {
        self.json(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str, body: Option<&Value>) -> Result<Value, ServiceError> {
        self.json(Method::DELETE, path, body).await
    }
}

/// Decode a response body, falling back to a JSON string for non-JSON text.
pub(crate) fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Build a rejection from an error response, preferring the service's message.
fn rejection(status: StatusCode, text: &str) -> ServiceError {
    let parsed: Option<Value> = serde_json::from_str(text).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()))
        })
        .map(str::to_string)
        .unwrap_or_else(|| {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                trimmed.to_string()
            }
        });
    ServiceError::Rejected {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_backend;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::{Json, Router, routing::get};
    use serde_json::json;

    async fn whoami(headers: HeaderMap) -> Json<Value> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        Json(json!({"apikey": header("apikey"), "authorization": header("authorization")}))
    }

    #[tokio::test]
    async fn test_requests_carry_service_key() {
        let base = spawn_backend(Router::new().route("/whoami", get(whoami))).await;
        let api = ApiClient::new(Client::new(), format!("{}/", base), Some("svc".into()));

        let body = api.get("/whoami").await.unwrap();
        assert_eq!(body["apikey"], "svc");
        assert_eq!(body["authorization"], "Bearer svc");
    }

    #[tokio::test]
    async fn test_rejection_prefers_service_message() {
        let app = Router::new()
            .route(
                "/json",
                get(|| async {
                    (
                        AxumStatus::NOT_FOUND,
                        Json(json!({"statusCode": "404", "error": "not_found", "message": "Bucket not found"})),
                    )
                }),
            )
            .route("/text", get(|| async { (AxumStatus::BAD_GATEWAY, "upstream down") }))
            .route("/empty", get(|| async { AxumStatus::SERVICE_UNAVAILABLE }));
        let base = spawn_backend(app).await;
        let api = ApiClient::new(Client::new(), base, None);

        match api.get("/json").await.unwrap_err() {
            ServiceError::Rejected { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Bucket not found");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(
            api.get("/text").await.unwrap_err().to_string(),
            "HTTP 502: upstream down"
        );
        assert_eq!(
            api.get("/empty").await.unwrap_err().to_string(),
            "HTTP 503: Service Unavailable"
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let api = ApiClient::new(Client::new(), "http://127.0.0.1:9", None);
        assert!(matches!(
            api.get("/anything").await.unwrap_err(),
            ServiceError::Unavailable(_)
        ));
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(""), Value::Null);
        assert_eq!(decode_body("{\"a\":1}"), json!({"a": 1}));
        assert_eq!(decode_body("hello"), json!("hello"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let api = ApiClient::new(Client::new(), "http://localhost:8000", Some("secret".into()));
        let debug = format!("{:?}", api);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("***"));
    }
}
