//! `selfbase serve`: run the MCP server over stdio or HTTP.

use super::load_config;
use anyhow::{Context, Result};
use clap::Args;
use selfbase_core::{McpConfig, Transport};
use selfbase_gateway::build_http_client;
use selfbase_mcp::{McpServer, ToolExecutor};
use selfbase_services::Services;
use std::path::PathBuf;
use tracing::{info, warn};

/// Arguments for `selfbase serve`.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Configuration file path.
    #[arg(short, long, default_value = "selfbase.yaml")]
    pub config: PathBuf,

    /// Transport type (stdio or http). Overrides config file.
    #[arg(long)]
    pub transport: Option<Transport>,

    /// HTTP host (only for http transport). Overrides config file.
    #[arg(long)]
    pub host: Option<String>,

    /// HTTP port (only for http transport). Overrides config file.
    #[arg(long)]
    pub port: Option<u16>,
}

impl ServeArgs {
    /// Apply command-line overrides on top of the file configuration.
    fn apply(&self, mcp: &mut McpConfig) {
        if let Some(transport) = self.transport {
            mcp.transport = transport;
        }
        if let Some(host) = &self.host {
            mcp.host = host.clone();
        }
        if let Some(port) = self.port {
            mcp.port = port;
        }
    }
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    args.apply(&mut config.mcp);

    if config.service_role_key().is_none() {
        warn!(
            env = %config.service_role_key_env,
            "No service role key configured; admin API calls will be unauthenticated"
        );
    }

    let http = build_http_client(&config).context("Failed to build HTTP client")?;
    let gateway = selfbase_gateway::connect(&config, http.clone())
        .await
        .context("Failed to set up SQL gateway")?;
    let services = Services::new(&config, http, gateway.clone());
    let executor = ToolExecutor::new(&config, gateway, services);
    let server = McpServer::new(config.mcp.clone(), executor);

    info!(
        transport = ?config.mcp.transport,
        tools = server.tools().len(),
        api_url = %config.api_url,
        "Starting selfbase MCP server"
    );

    server.run().await.context("MCP server failed")?;
    Ok(())
}
