//! CLI command definitions and dispatch.

mod extract;
mod inspect;
mod status;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use rootprep_core::{LogLevel, ProvisionConfig, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

pub use extract::ExtractArgs;
pub use inspect::InspectArgs;
pub use status::StatusArgs;

/// rootprep - prepare a root filesystem from an OCI image directory.
#[derive(Parser)]
#[command(name = "rootprep", version, about)]
pub struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Load the configuration file, if any, and apply flag overrides.
    pub fn load_config(&self) -> Result<ProvisionConfig> {
        let mut config = match &self.config {
            Some(path) => ProvisionConfig::from_file(path)?,
            None => ProvisionConfig::default(),
        };
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if self.quiet {
            config.quiet = true;
        }
        Ok(config)
    }
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Extract every missing or incomplete layer and print the top layer
    Extract(ExtractArgs),
    /// Show image platform and layers as JSON
    Inspect(InspectArgs),
    /// Show the store state of every image layer
    Status(StatusArgs),
}

/// Dispatch a parsed command to its handler.
pub async fn dispatch(
    command: Command,
    config: ProvisionConfig,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Extract(args) => extract::execute(args, config).await,
        Command::Inspect(args) => inspect::execute(args, config).await,
        Command::Status(args) => status::execute(args, config).await,
    }
}

/// Log filter for `level`. Non-empty `RUST_LOG` directives win over it.
pub fn log_filter(level: LogLevel, rust_log: Option<&str>) -> EnvFilter {
    let level: tracing::Level = level.into();
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(rust_log.unwrap_or_default())
}

/// Image directory from the flag, falling back to the configuration.
pub(crate) fn image_dir(flag: Option<PathBuf>, config: &ProvisionConfig) -> Result<PathBuf> {
    match flag {
        Some(dir) => Ok(dir),
        None => config.require_image_dir().map(Path::to_path_buf),
    }
}

/// Layer store directory from the flag, falling back to the configuration.
pub(crate) fn store_dir(flag: Option<PathBuf>, config: &ProvisionConfig) -> Result<PathBuf> {
    match flag {
        Some(dir) => Ok(dir),
        None => config.require_layer_store_dir().map(Path::to_path_buf),
    }
}
