mod cli;
mod dispatcher;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use colored::Colorize;
use dispatcher::AppContext;
use goldtrack::config::Config;
use goldtrack::error::TrackerError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays clean for tables and JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(err) = run(&cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        std::process::exit(exit_code(&err));
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(None)?;
    let ctx = AppContext::from_cli(cli, config);
    dispatcher::dispatch_command(&cli.command, &ctx).await
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match TrackerError::kind_of(err) {
        Some(TrackerError::Validation(_)) => 2,
        Some(TrackerError::NotFound(_)) => 3,
        Some(TrackerError::Upstream(_)) => 4,
        Some(TrackerError::Conflict(_)) => 5,
        Some(TrackerError::Config(_)) => 6,
        _ => 1,
    }
}
