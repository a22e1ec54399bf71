//! rootprep runtime - prepares a container root filesystem from an OCI
//! image directory.
//!
//! The [`ImageManager`] loads the image metadata and reconciles every layer
//! against a [`LayerStore`], extracting only what is missing or broken.

pub mod layer;
pub mod oci;

// Re-export common types
pub use layer::{FsLayerStore, LayerMeta, LayerState, LayerStore};
pub use oci::{Digest, ImageManager, ImageMetadata, ImagePlatform, LayerStatus};

/// rootprep runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
