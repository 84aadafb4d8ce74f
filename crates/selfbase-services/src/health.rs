//! Deployment health.
//!
//! Probes run one after another. A failing probe marks its service unhealthy
//! and never fails the check itself.

use crate::client::ApiClient;
use reqwest::Method;
use selfbase_gateway::SqlGateway;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// HTTP services probed after the database, with their health paths.
pub const HTTP_PROBES: &[(&str, &str)] = &[
    ("auth", "/auth/v1/health"),
    ("storage", "/storage/v1/status"),
    ("rest", "/rest/v1/"),
];

/// Health of one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub service: String,
    pub healthy: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Aggregate health of the deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub services: Vec<ServiceHealth>,
}

impl HealthReport {
    fn from_services(services: Vec<ServiceHealth>) -> Self {
        Self {
            healthy: services.iter().all(|s| s.healthy),
            services,
        }
    }
}

/// Runs the database and HTTP probes.
#[derive(Clone)]
pub struct HealthChecker {
    gateway: Arc<dyn SqlGateway>,
    api: ApiClient,
}

impl HealthChecker {
    pub fn new(gateway: Arc<dyn SqlGateway>, api: ApiClient) -> Self {
        Self { gateway, api }
    }

    pub async fn check(&self) -> HealthReport {
        let mut services = Vec::with_capacity(HTTP_PROBES.len() + 1);
        services.push(self.probe_database().await);
        for (service, path) in HTTP_PROBES {
            services.push(self.probe_http(service, path).await);
        }

        let report = HealthReport::from_services(services);
        if !report.healthy {
            let down: Vec<&str> = report
                .services
                .iter()
                .filter(|s| !s.healthy)
                .map(|s| s.service.as_str())
                .collect();
            warn!(services = ?down, "Health check found unhealthy services");
        }
        report
    }

    async fn probe_database(&self) -> ServiceHealth {
        let started = Instant::now();
        let result = self.gateway.execute("select 1", true).await;
        let latency_ms = elapsed_ms(started);
        debug!(latency_ms, ok = result.is_ok(), "Probed database");
        ServiceHealth {
            service: "db".to_string(),
            healthy: result.is_ok(),
            latency_ms,
            detail: result.err().map(|e| e.to_string()),
        }
    }

    async fn probe_http(&self, service: &str, path: &str) -> ServiceHealth {
        let started = Instant::now();
        let result = self.api.send(Method::GET, path, None).await;
        let latency_ms = elapsed_ms(started);
        debug!(service = %service, latency_ms, "Probed service");

        let (healthy, detail) = match result {
            Ok((status, _)) if status.is_success() => (true, None),
            Ok((status, body)) => {
                let body = body.trim();
                let detail = if body.is_empty() {
                    format!("HTTP {}", status.as_u16())
                } else {
                    format!("HTTP {}: {}", status.as_u16(), body)
                };
                (false, Some(detail))
            }
            Err(e) => (false, Some(e.to_string())),
        };
        ServiceHealth {
            service: service.to_string(),
            healthy,
            latency_ms,
            detail,
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{api_for, spawn_backend};
    use axum::http::StatusCode;
    use axum::{Router, routing::get};
    use selfbase_gateway::GatewayError;
    use selfbase_gateway::testing::ScriptedGateway;
    use serde_json::json;

    #[tokio::test]
    async fn test_all_healthy() {
        let app = Router::new()
            .route("/auth/v1/health", get(|| async { "{\"name\":\"GoTrue\"}" }))
            .route("/storage/v1/status", get(|| async { "" }))
            .route("/rest/v1/", get(|| async { "{}" }));
        let base = spawn_backend(app).await;
        let gateway = Arc::new(ScriptedGateway::new().on("select 1", vec![json!({"?column?": 1})]));

        let report = HealthChecker::new(gateway.clone(), api_for(&base)).check().await;
        assert!(report.healthy);
        let names: Vec<_> = report.services.iter().map(|s| s.service.as_str()).collect();
        assert_eq!(names, vec!["db", "auth", "storage", "rest"]);
        assert!(gateway.calls()[0].read_only);
    }

    #[tokio::test]
    async fn test_failures_are_reported_not_raised() {
        let app = Router::new()
            .route("/auth/v1/health", get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }))
            .route("/storage/v1/status", get(|| async { "" }));
        let base = spawn_backend(app).await;
        let gateway = Arc::new(
            ScriptedGateway::new().fail_on("select 1", GatewayError::Unavailable("refused".into())),
        );

        let report = HealthChecker::new(gateway, api_for(&base)).check().await;
        assert!(!report.healthy);

        let by_name = |name: &str| report.services.iter().find(|s| s.service == name).unwrap();
        assert!(!by_name("db").healthy);
        assert!(by_name("db").detail.as_deref().unwrap().contains("refused"));
        assert_eq!(by_name("auth").detail.as_deref(), Some("HTTP 502: upstream down"));
        assert!(by_name("storage").healthy);
        // No route: axum answers 404.
        assert_eq!(by_name("rest").detail.as_deref(), Some("HTTP 404"));
    }

    #[tokio::test]
    async fn test_unreachable_gateway() {
        let gateway = Arc::new(ScriptedGateway::new());
        let report = HealthChecker::new(gateway, api_for("http://127.0.0.1:9")).check().await;
        assert!(!report.healthy);
        assert!(report.services[0].healthy);
        assert!(report.services[1..].iter().all(|s| !s.healthy && s.detail.is_some()));
    }
}
