//! # selfbase-mcp
//!
//! MCP (Model Context Protocol) server exposing a self-hosted database
//! platform's administrative surface as tools for AI agents.
//!
//! - **Branching**: schema-based branches with per-branch migration ledgers
//! - **Database**: raw SQL, catalog listings, migrations
//! - **Storage / Auth / Edge functions**: admin APIs behind the API gateway
//! - **Operations**: health and connection details
//! - **Transports**: stdio and HTTP (with SSE)
//!
//! ## Architecture
//!
//! ```text
//! AI Agent
//!       │
//!       │ MCP protocol (list tools / call tool)
//!       ▼
//! ┌──────────────────────┐
//! │  McpServer           │
//! │  1. Route method     │
//! │  2. Validate args    │  ← tool input schema
//! │  3. Dispatch handler │
//! │  4. Return JSON text │
//! └──────────┬───────────┘
//!            │
//!     ┌──────┴──────────────┐
//!     ▼                     ▼
//! SqlGateway          API gateway (storage, auth,
//! (branching, SQL)    functions, health)
//! ```

pub mod catalog;
pub mod error;
pub mod executor;
mod handlers;
pub mod http_transport;
pub mod protocol;
pub mod server;
pub mod tools;

// Re-export main types
pub use error::{McpError, ToolError};
pub use executor::{ExecutionResult, ToolExecutor};
pub use protocol::{
    CallToolParams, JsonRpcRequest, JsonRpcResponse, ToolAnnotations, ToolContent, ToolDefinition,
};
pub use server::McpServer;
pub use tools::ToolRegistry;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::executor::ToolExecutor;
    use selfbase_core::SelfbaseConfig;
    use selfbase_gateway::SqlGateway;
    use selfbase_services::Services;
    use std::sync::Arc;

    /// Executor over `gateway`, with HTTP services pointed at a closed port.
    pub fn executor_with(gateway: Arc<dyn SqlGateway>) -> ToolExecutor {
        let config = SelfbaseConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            anon_key_env: String::new(),
            service_role_key_env: String::new(),
            ..Default::default()
        };
        executor_for(&config, gateway)
    }

    pub fn executor_for(config: &SelfbaseConfig, gateway: Arc<dyn SqlGateway>) -> ToolExecutor {
        let services = Services::new(config, reqwest::Client::new(), gateway.clone());
        ToolExecutor::new(config, gateway, services)
    }
}
