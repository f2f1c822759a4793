#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod commands;
mod config;
mod server;

use std::process;

use anyhow::Context;

use crate::config::{Cli, Command};

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "papercast_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "papercast_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "papercast_cli::config";
pub const TRACING_TARGET_RUN: &str = "papercast_cli::run";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::debug!(
            target: TRACING_TARGET_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %format!("{error:#}"),
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    cli.telemetry.init_tracing();
    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting papercast"
    );

    cli.log();
    cli.validate().context("invalid configuration")?;

    let pipelines = cli.dispatch.load(&cli.pipelines).await?;

    match cli.command {
        Command::Serve(config) => {
            if let Err(error) = commands::serve(pipelines, config).await {
                if error.is_recoverable() {
                    tracing::warn!(
                        target: TRACING_TARGET_STARTUP,
                        "server error may clear up by retrying or changing the address"
                    );
                }
                return Err(error).context("server failed");
            }
        }
        Command::Run(args) => commands::run(&pipelines, args).await?,
        Command::List => commands::list(&pipelines)?,
    }

    Ok(())
}
