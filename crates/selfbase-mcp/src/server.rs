//! MCP server implementation.
//!
//! This module provides the main MCP server that handles tool discovery
//! and execution over stdio or HTTP.

use crate::catalog;
use crate::error::McpError;
use crate::executor::{ExecutionResult, ToolExecutor};
use crate::http_transport::{HttpServer, RequestSender};
use crate::protocol::*;
use crate::tools::ToolRegistry;
use selfbase_core::{McpConfig, Transport};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// Capacity of the channel between the HTTP transport and the handler task.
const HTTP_QUEUE_DEPTH: usize = 100;

/// The MCP server. Cheap to clone; clones share the executor.
#[derive(Clone)]
pub struct McpServer {
    config: McpConfig,
    tools: Arc<ToolRegistry>,
    executor: Arc<ToolExecutor>,
}

impl McpServer {
    /// Create a server exposing the full tool catalog.
    pub fn new(config: McpConfig, executor: ToolExecutor) -> Self {
        Self {
            config,
            tools: Arc::new(catalog::registry()),
            executor: Arc::new(executor),
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Start the MCP server on the configured transport.
    pub async fn run(&self) -> Result<(), McpError> {
        tracing::info!(tool_count = self.tools.len(), "Tool catalog loaded");
        match self.config.transport {
            Transport::Stdio => self.run_stdio().await,
            Transport::Http => self.run_http().await,
        }
    }

    /// Run the server with stdio transport: one JSON-RPC message per line.
    async fn run_stdio(&self) -> Result<(), McpError> {
        tracing::info!("Starting MCP server with stdio transport");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let (response, shutdown) = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) => {
                    let shutdown = request.method == "shutdown";
                    (self.handle_message(request).await, shutdown)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Unparseable message on stdin");
                    (
                        Some(JsonRpcResponse::error(
                            None,
                            codes::PARSE_ERROR,
                            format!("Parse error: {}", e),
                        )),
                        false,
                    )
                }
            };

            if let Some(response) = response {
                let mut response_json = serde_json::to_string(&response)?;
                response_json.push('\n');
                stdout.write_all(response_json.as_bytes()).await?;
                stdout.flush().await?;
            }
            if shutdown {
                break;
            }
        }

        tracing::info!("stdin closed, stopping MCP server");
        Ok(())
    }

    /// Run the server with HTTP transport.
    pub async fn run_http(&self) -> Result<(), McpError> {
        let bind_address = self.config.bind_address();
        tracing::info!(address = %bind_address, "Starting MCP server with HTTP transport");

        let (request_tx, request_rx) = mpsc::channel(HTTP_QUEUE_DEPTH);
        tokio::spawn(self.clone().serve_channel(request_rx));

        HttpServer::new(bind_address, request_tx).run().await
    }

    /// Answer requests forwarded by the HTTP transport, one at a time.
    pub async fn serve_channel(
        self,
        mut request_rx: mpsc::Receiver<(JsonRpcRequest, RequestSender)>,
    ) {
        while let Some((request, response_tx)) = request_rx.recv().await {
            let response = self.handle_message(request).await;
            let _ = response_tx.send(response);
        }
    }

    /// Handle one incoming message. Notifications get no response.
    pub async fn handle_message(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            match request.method.as_str() {
                "initialized" | "notifications/initialized" => {
                    tracing::debug!("Client initialized");
                }
                other => tracing::debug!(method = %other, "Ignoring notification"),
            }
            return None;
        }
        Some(self.handle_request(request).await)
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::error(
                id,
                codes::INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            );
        }

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "initialized" | "notifications/initialized" => JsonRpcResponse::success(id, json!({})),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "shutdown" => self.handle_shutdown(id),
            _ => JsonRpcResponse::error(
                id,
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": "selfbase-mcp",
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            }
        });
        JsonRpcResponse::success(id, result)
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        match serde_json::to_value(self.tools.list()) {
            Ok(tools) => JsonRpcResponse::success(id, json!({ "tools": tools })),
            Err(e) => JsonRpcResponse::error(id, codes::INTERNAL_ERROR, e.to_string()),
        }
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        codes::INVALID_PARAMS,
                        format!("Invalid params: {}", e),
                    );
                }
            },
            None => return JsonRpcResponse::error(id, codes::INVALID_PARAMS, "Missing params"),
        };

        let Some(tool) = self.tools.get(&params.name) else {
            return JsonRpcResponse::error(
                id,
                codes::INVALID_PARAMS,
                format!("Tool not found: {}", params.name),
            );
        };

        let result = self.executor.execute(tool, params.arguments).await;
        execution_result_to_response(id, result)
    }

    fn handle_shutdown(&self, id: Option<Value>) -> JsonRpcResponse {
        tracing::info!("MCP server shutdown requested");
        JsonRpcResponse::success(id, json!(null))
    }
}

fn execution_result_to_response(id: Option<Value>, result: ExecutionResult) -> JsonRpcResponse {
    let response = CallToolResponse {
        content: result.content,
        is_error: !result.success,
    };
    match serde_json::to_value(response) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, codes::INTERNAL_ERROR, e.to_string()),
    }
}
