//! `selfbase check`: one-shot health probe of the database and services.

use super::load_config;
use anyhow::{Context, Result};
use clap::Args;
use selfbase_gateway::build_http_client;
use selfbase_services::Services;
use std::path::PathBuf;

/// Arguments for `selfbase check`.
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Configuration file path.
    #[arg(short, long, default_value = "selfbase.yaml")]
    pub config: PathBuf,
}

pub async fn execute(args: CheckArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let http = build_http_client(&config).context("Failed to build HTTP client")?;
    let gateway = selfbase_gateway::connect(&config, http.clone())
        .await
        .context("Failed to set up SQL gateway")?;
    let services = Services::new(&config, http, gateway);

    let report = services.health.check().await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.healthy {
        let failing: Vec<&str> = report
            .services
            .iter()
            .filter(|s| !s.healthy)
            .map(|s| s.service.as_str())
            .collect();
        anyhow::bail!("Unhealthy services: {}", failing.join(", "));
    }
    Ok(())
}
