use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ProvisionError, Result};

/// Provisioning configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// OCI image directory to read from
    pub image_dir: Option<PathBuf>,

    /// Root directory of the layer store
    pub layer_store_dir: Option<PathBuf>,

    /// Log level
    pub log_level: LogLevel,

    /// Suppress progress output
    pub quiet: bool,
}

impl ProvisionConfig {
    /// Load a configuration file (YAML).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProvisionError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// The image directory, or a configuration error when unset.
    pub fn require_image_dir(&self) -> Result<&Path> {
        self.image_dir
            .as_deref()
            .ok_or_else(|| ProvisionError::Config("image directory not set".to_string()))
    }

    /// The layer store directory, or a configuration error when unset.
    pub fn require_layer_store_dir(&self) -> Result<&Path> {
        self.layer_store_dir
            .as_deref()
            .ok_or_else(|| ProvisionError::Config("layer store directory not set".to_string()))
    }
}

/// Log level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!(
                "unknown log level: '{}' (supported: debug, info, warn, error)",
                s
            )),
        }
    }
}
