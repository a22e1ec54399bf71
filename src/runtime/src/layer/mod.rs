//! Layer storage.
//!
//! The image manager drives extraction through the [`LayerStore`] trait and
//! only reacts to the state the store reports. [`FsLayerStore`] keeps each
//! layer in its own directory on the local filesystem.

mod fs;

#[cfg(test)]
pub(crate) mod fake;

pub use fs::{FsLayerStore, LayerMeta};

use rootprep_core::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extraction state of a layer, as persisted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerState {
    /// Fully extracted, safe to reuse.
    Valid,
    /// Partially extracted; must be deleted and extracted again.
    Incomplete,
    /// Never extracted.
    Absent,
}

impl std::fmt::Display for LayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Incomplete => write!(f, "incomplete"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// Storage backend for extracted layers.
///
/// Implementations own layer state. Concurrent mutation of one layer
/// identifier from several callers must be serialized by the store.
pub trait LayerStore: Send + Sync {
    /// Extract a gzip-compressed tar archive as layer `layer_id` on top of
    /// `parents` (nearest parent first, base layer last).
    fn extract(&self, archive: &Path, layer_id: &str, parents: &[String]) -> Result<()>;

    /// Report the state of `layer_id`.
    fn state(&self, layer_id: &str) -> Result<LayerState>;

    /// Remove all on-disk data for `layer_id`.
    fn delete(&self, layer_id: &str) -> Result<()>;
}
