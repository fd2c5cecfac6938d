//! Synocast CLI entry point.

use anyhow::Result;
use clap::Parser;
use synocast::cli::{commands, Cli, Commands, Output};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("synocast={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    Output::banner();

    match &cli.command {
        Commands::Run {
            config,
            output_dir,
            dry_run,
            strict,
            ytdlp,
        } => {
            commands::run_sources(config.as_deref(), output_dir.clone(), *dry_run, *strict, ytdlp)
                .await?;
        }

        Commands::Check { config } => {
            commands::run_check(config.as_deref())?;
        }

        Commands::Doctor { config, ytdlp } => {
            commands::run_doctor(config.as_deref(), ytdlp)?;
        }
    }

    Ok(())
}
