//! HTTP transport for MCP server.
//!
//! `POST /mcp` carries JSON-RPC requests and answers in the response body.
//! `GET /mcp` opens an SSE stream; its first event names the endpoint (with a
//! session id) to post to, and responses to requests posted with that
//! session id are pushed onto the stream as well.

use crate::error::McpError;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse, codes};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response, Sse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, oneshot};
use tower_http::trace::TraceLayer;

/// Reply slot for one forwarded request; `None` for notifications.
pub type RequestSender = oneshot::Sender<Option<JsonRpcResponse>>;

/// HTTP transport handler state.
pub struct HttpTransportState {
    /// Channel for sending requests to the MCP server.
    request_tx: mpsc::Sender<(JsonRpcRequest, RequestSender)>,
    /// Active SSE connections by session id.
    sse_connections: RwLock<HashMap<String, mpsc::Sender<SseEvent>>>,
}

impl HttpTransportState {
    /// Create a new HTTP transport state.
    pub fn new(request_tx: mpsc::Sender<(JsonRpcRequest, RequestSender)>) -> Self {
        Self {
            request_tx,
            sse_connections: RwLock::new(HashMap::new()),
        }
    }

    /// Number of open SSE sessions.
    pub async fn session_count(&self) -> usize {
        self.sse_connections.read().await.len()
    }

    /// Push an event to a session, dropping the session if its stream is gone.
    async fn push(&self, session_id: &str, event: SseEvent) {
        let sender = self.sse_connections.read().await.get(session_id).cloned();
        if let Some(sender) = sender
            && sender.send(event).await.is_err()
        {
            tracing::debug!(session_id = %session_id, "SSE session closed");
            self.sse_connections.write().await.remove(session_id);
        }
    }
}

/// SSE event for streaming.
#[derive(Debug, Clone, Serialize)]
pub struct SseEvent {
    pub event: String,
    pub data: serde_json::Value,
}

/// Query parameters for MCP endpoint.
#[derive(Debug, Deserialize)]
pub struct McpQuery {
    /// Session ID for SSE connections.
    session_id: Option<String>,
}

/// Create the HTTP router for MCP.
pub fn create_router(state: Arc<HttpTransportState>) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp_post).get(handle_mcp_sse))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle POST requests to /mcp (JSON-RPC over HTTP).
async fn handle_mcp_post(
    State(state): State<Arc<HttpTransportState>>,
    Query(query): Query<McpQuery>,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    let (response_tx, response_rx) = oneshot::channel();

    if state.request_tx.send((request, response_tx)).await.is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(JsonRpcResponse::error(
                None,
                codes::INTERNAL_ERROR,
                "MCP server unavailable",
            )),
        )
            .into_response();
    }

    match response_rx.await {
        Ok(Some(response)) => {
            if let Some(session_id) = &query.session_id {
                let data = serde_json::to_value(&response).unwrap_or_default();
                state
                    .push(
                        session_id,
                        SseEvent {
                            event: "message".to_string(),
                            data,
                        },
                    )
                    .await;
            }
            (StatusCode::OK, Json(response)).into_response()
        }
        // Notification: accepted, nothing to say.
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(JsonRpcResponse::error(
                None,
                codes::INTERNAL_ERROR,
                "No response from MCP server",
            )),
        )
            .into_response(),
    }
}

/// Handle GET requests to /mcp (SSE streaming).
async fn handle_mcp_sse(
    State(state): State<Arc<HttpTransportState>>,
    Query(query): Query<McpQuery>,
) -> impl IntoResponse {
    let session_id = query
        .session_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let (event_tx, event_rx) = mpsc::channel(100);
    state
        .sse_connections
        .write()
        .await
        .insert(session_id.clone(), event_tx);
    tracing::debug!(session_id = %session_id, "SSE session opened");

    let endpoint = format!("/mcp?session_id={}", session_id);
    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(axum::response::sse::Event::default()
            .event("endpoint")
            .data(endpoint));

        let mut rx = event_rx;
        while let Some(event) = rx.recv().await {
            let data = serde_json::to_string(&event.data).unwrap_or_default();
            yield Ok::<_, Infallible>(axum::response::sse::Event::default()
                .event(event.event)
                .data(data));
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(std::time::Duration::from_secs(30))
            .text("ping"),
    )
}

/// Handle health check requests.
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "selfbase-mcp",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// HTTP server for MCP transport.
pub struct HttpServer {
    bind_address: String,
    state: Arc<HttpTransportState>,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(
        bind_address: impl Into<String>,
        request_tx: mpsc::Sender<(JsonRpcRequest, RequestSender)>,
    ) -> Self {
        Self {
            bind_address: bind_address.into(),
            state: Arc::new(HttpTransportState::new(request_tx)),
        }
    }

    /// Run the HTTP server until ctrl-c.
    pub async fn run(self) -> Result<(), McpError> {
        let app = create_router(self.state);

        let listener = tokio::net::TcpListener::bind(&self.bind_address)
            .await
            .map_err(|e| {
                McpError::StartupFailed(format!("Failed to bind to {}: {}", self.bind_address, e))
            })?;

        tracing::info!(address = %self.bind_address, "MCP HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down MCP HTTP server");
            })
            .await
            .map_err(|e| McpError::TransportError(e.to_string()))?;

        Ok(())
    }
}
