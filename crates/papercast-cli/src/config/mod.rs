//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── pipelines: PathBuf            # Pipeline manifest
//! ├── dispatch: DispatchConfig      # Engine limits and timeouts
//! ├── telemetry: TelemetryConfig    # Log output format
//! └── command: Command
//!     ├── serve: ServerConfig       # Host, port, shutdown
//!     ├── run                       # One seed through one pipeline
//!     └── list                      # Registered pipelines
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.

mod dispatch;
mod server;
mod telemetry;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
pub use dispatch::DispatchConfig;
pub use server::ServerConfig;
pub use telemetry::{LogFormat, TelemetryConfig};

use crate::TRACING_TARGET_STARTUP;
use crate::commands::RunArgs;

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "papercast")]
#[command(about = "Turns papers into podcast episodes through pipeline graphs")]
#[command(version)]
pub struct Cli {
    /// Pipeline manifest (JSON) to load.
    #[arg(long, global = true, env = "PAPERCAST_PIPELINES", default_value = "pipelines.json")]
    pub pipelines: PathBuf,

    /// Engine limits and timeouts.
    #[clap(flatten)]
    pub dispatch: DispatchConfig,

    /// Log output configuration.
    #[clap(flatten)]
    pub telemetry: TelemetryConfig,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do once pipelines are loaded.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve registered pipelines over HTTP.
    Serve(ServerConfig),
    /// Run one seed through a pipeline and print the report as JSON.
    Run(RunArgs),
    /// List registered pipelines as JSON.
    List,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.dispatch.validate()?;
        if let Command::Serve(server) = &self.command {
            server.validate()?;
        }
        Ok(())
    }

    /// Logs configuration.
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        self.dispatch.log(&self.pipelines);
        if let Command::Serve(server) = &self.command {
            server.log();
        }
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}
