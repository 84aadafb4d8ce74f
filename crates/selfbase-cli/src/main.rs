use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{check::CheckArgs, serve::ServeArgs, tools::ToolsArgs};

#[derive(Parser, Debug)]
#[command(
    name = "selfbase",
    version,
    about = "MCP server for a self-hosted database platform"
)]
struct Cli {
    /// Log filter (e.g. "debug", "selfbase_branching=trace"). Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the MCP server.
    Serve(ServeArgs),

    /// List the tools the server exposes.
    Tools(ToolsArgs),

    /// Probe the database and backend services and report their health.
    Check(CheckArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.cmd {
        Command::Serve(args) => commands::serve::execute(args).await?,
        Command::Tools(args) => commands::tools::execute(args)?,
        Command::Check(args) => commands::check::execute(args).await?,
    }

    Ok(())
}

/// Logs go to stderr; stdout belongs to the stdio transport.
fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
