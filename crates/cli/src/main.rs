//! # bagscribe
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Recording inspection
//! - Transcription with progress and graceful shutdown

mod cli;
mod commands;
mod error;
mod progress;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_transcription, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let metrics_port = match &cli.command {
        Commands::Run(args) => args.metrics_port,
        _ => None,
    };
    observability::init_with_config(observability::ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port,
        default_log_level: cli.log_level().to_string(),
    })?;

    info!(version = env!("CARGO_PKG_VERSION"), "bagscribe starting");

    let result = match &cli.command {
        Commands::Run(args) => run_transcription(args, !cli.quiet).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}
