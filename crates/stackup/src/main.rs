//! The `stackup` CLI: installs, configures, and starts the platform's
//! services on this host, one at a time in dependency order.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod wiring;

#[derive(Parser)]
#[command(name = "stackup")]
#[command(about = "Multi-service platform installer")]
#[command(version)]
struct Cli {
    /// Deployment configuration file
    #[arg(short, long, global = true, default_value = "deployment.yaml")]
    config: PathBuf,

    /// Stack plan file; the built-in plan is used when omitted
    #[arg(short, long, global = true)]
    plan: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install, configure, start, and initialize every service
    Deploy,

    /// Remove service packages in reverse dependency order
    Remove,

    /// Show per-service initialization status
    Status,

    /// Validate the deployment configuration and stack plan
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    smol::block_on(async {
        match cli.command {
            Commands::Deploy => commands::deploy::run(&cli.config, cli.plan.as_deref()).await,
            Commands::Remove => commands::remove::run(&cli.config, cli.plan.as_deref()).await,
            Commands::Status => commands::status::run(&cli.config, cli.plan.as_deref()).await,
            Commands::Validate => commands::validate::run(&cli.config, cli.plan.as_deref()).await,
        }
    })
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
