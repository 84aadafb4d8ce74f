//! `selfbase tools`: print the tool catalog without connecting anywhere.

use anyhow::Result;
use clap::Args;
use selfbase_mcp::catalog;

/// Arguments for `selfbase tools`.
#[derive(Debug, Args)]
pub struct ToolsArgs {
    /// Print each tool's input schema.
    #[arg(long)]
    pub verbose: bool,
}

pub fn execute(args: ToolsArgs) -> Result<()> {
    let tools = catalog::registry();

    println!("Available tools ({}):", tools.len());
    for tool in tools.list() {
        let annotations = tool.annotations.as_ref();
        let mut badges = vec![if annotations.is_some_and(|a| a.read_only == Some(true)) {
            "read"
        } else {
            "write"
        }];
        if annotations.is_some_and(|a| a.destructive == Some(true)) {
            badges.push("destructive");
        }

        println!("  {:<24} [{}]", tool.name, badges.join(", "));
        if let Some(description) = &tool.description {
            println!("      {}", description);
        }
        if args.verbose {
            let schema = serde_json::to_string_pretty(&tool.input_schema)?;
            for line in schema.lines() {
                println!("      {}", line);
            }
        }
    }

    Ok(())
}
