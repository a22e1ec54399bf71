//! rootprep core - shared error and configuration types.
//!
//! Used by the runtime (image manager, layer store) and the CLI.

pub mod config;
pub mod error;

pub use config::{LogLevel, ProvisionConfig};
pub use error::{ProvisionError, Result};

/// rootprep version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
