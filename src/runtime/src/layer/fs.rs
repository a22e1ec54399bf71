//! Filesystem-backed layer store.
//!
//! Each layer lives under `root/<id>/`:
//!
//! ```text
//! <id>/
//! ├── diff/          extracted layer contents
//! ├── layer.json     metadata, written once extraction succeeded
//! └── incomplete     marker present while extraction is in progress
//! ```
//!
//! A crash mid-extraction leaves the marker behind, so the layer reports
//! [`LayerState::Incomplete`] on the next run.

use parking_lot::Mutex;
use rootprep_core::error::{ProvisionError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{LayerState, LayerStore};
use crate::oci::layers::unpack_layer;

const DIFF_DIR: &str = "diff";
const META_FILE: &str = "layer.json";
const INCOMPLETE_MARKER: &str = "incomplete";

/// Metadata for an extracted layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMeta {
    /// Layer identifier
    pub id: String,
    /// Parent chain the layer was extracted on, nearest first
    pub parents: Vec<String>,
    /// Size of the extracted contents in bytes
    pub size_bytes: u64,
    /// When extraction finished (Unix timestamp)
    pub extracted_at: i64,
}

/// Layer store keeping one directory per layer.
pub struct FsLayerStore {
    /// Root directory holding one subdirectory per layer
    root: PathBuf,

    /// Serializes mutations from this process
    lock: Mutex<()>,
}

impl FsLayerStore {
    /// Open a layer store at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| {
            ProvisionError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "failed to create layer store directory {}: {}",
                    root.display(),
                    e
                ),
            ))
        })?;

        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding layer `layer_id`.
    pub fn layer_dir(&self, layer_id: &str) -> PathBuf {
        self.root.join(layer_id)
    }

    /// Directory holding the extracted contents of `layer_id`.
    pub fn diff_dir(&self, layer_id: &str) -> PathBuf {
        self.layer_dir(layer_id).join(DIFF_DIR)
    }

    /// Metadata of a valid layer, `None` if the layer is not valid.
    pub fn meta(&self, layer_id: &str) -> Result<Option<LayerMeta>> {
        check_layer_id(layer_id)?;
        if self.read_state(layer_id) != LayerState::Valid {
            return Ok(None);
        }
        Ok(self.read_meta(layer_id))
    }

    fn read_meta(&self, layer_id: &str) -> Option<LayerMeta> {
        let content = std::fs::read_to_string(self.layer_dir(layer_id).join(META_FILE)).ok()?;
        let meta: LayerMeta = serde_json::from_str(&content).ok()?;
        (meta.id == layer_id).then_some(meta)
    }

    fn read_state(&self, layer_id: &str) -> LayerState {
        let dir = self.layer_dir(layer_id);
        match std::fs::symlink_metadata(&dir) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LayerState::Absent,
            // Anything else at the layer path must be deleted before extraction
            Err(_) => return LayerState::Incomplete,
            Ok(meta) if !meta.is_dir() => return LayerState::Incomplete,
            Ok(_) => {}
        }
        if dir.join(INCOMPLETE_MARKER).exists() || self.read_meta(layer_id).is_none() {
            return LayerState::Incomplete;
        }
        LayerState::Valid
    }

    fn populate(&self, archive: &Path, layer_id: &str, parents: &[String]) -> Result<()> {
        let dir = self.layer_dir(layer_id);
        let fail = |what: &str, e: &dyn std::fmt::Display| {
            ProvisionError::layer_store(layer_id, format!("{}: {}", what, e))
        };

        std::fs::create_dir_all(&dir)
            .map_err(|e| fail(&format!("failed to create {}", dir.display()), &e))?;
        std::fs::write(dir.join(INCOMPLETE_MARKER), b"")
            .map_err(|e| fail("failed to write incomplete marker", &e))?;

        let diff = dir.join(DIFF_DIR);
        unpack_layer(archive, &diff).map_err(|e| fail("failed to unpack layer", &e))?;
        let size_bytes =
            dir_size(&diff).map_err(|e| fail("failed to measure extracted layer", &e))?;

        let meta = LayerMeta {
            id: layer_id.to_string(),
            parents: parents.to_vec(),
            size_bytes,
            extracted_at: chrono::Utc::now().timestamp(),
        };
        let json = serde_json::to_string_pretty(&meta)?;
        std::fs::write(dir.join(META_FILE), json)
            .map_err(|e| fail("failed to write layer metadata", &e))?;

        std::fs::remove_file(dir.join(INCOMPLETE_MARKER))
            .map_err(|e| fail("failed to clear incomplete marker", &e))?;

        tracing::info!(
            layer = %layer_id,
            parents = parents.len(),
            size_bytes = meta.size_bytes,
            "Extracted layer"
        );

        Ok(())
    }
}

impl LayerStore for FsLayerStore {
    fn extract(&self, archive: &Path, layer_id: &str, parents: &[String]) -> Result<()> {
        check_layer_id(layer_id)?;
        let _guard = self.lock.lock();

        for parent in parents {
            check_layer_id(parent)?;
            let state = self.read_state(parent);
            if state != LayerState::Valid {
                return Err(ProvisionError::layer_store(
                    layer_id,
                    format!("parent layer {} is {}", parent, state),
                ));
            }
        }

        if std::fs::symlink_metadata(self.layer_dir(layer_id)).is_ok() {
            return Err(ProvisionError::layer_store(
                layer_id,
                "layer directory already exists",
            ));
        }

        self.populate(archive, layer_id, parents)
    }

    fn state(&self, layer_id: &str) -> Result<LayerState> {
        check_layer_id(layer_id)?;
        Ok(self.read_state(layer_id))
    }

    fn delete(&self, layer_id: &str) -> Result<()> {
        check_layer_id(layer_id)?;
        let _guard = self.lock.lock();

        let dir = self.layer_dir(layer_id);
        let removed = match std::fs::symlink_metadata(&dir) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => Err(e),
            Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(&dir),
            Ok(_) => std::fs::remove_file(&dir),
        };
        removed.map_err(|e| {
            ProvisionError::layer_store(
                layer_id,
                format!("failed to remove {}: {}", dir.display(), e),
            )
        })?;
        tracing::debug!(layer = %layer_id, "Deleted layer");

        Ok(())
    }
}

/// Layer identifiers become directory names; only ASCII alphanumerics pass.
fn check_layer_id(layer_id: &str) -> Result<()> {
    if layer_id.is_empty() || !layer_id.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ProvisionError::layer_store(
            layer_id,
            "layer identifier must be non-empty ASCII alphanumerics",
        ));
    }
    Ok(())
}

/// Calculate the total size of a directory recursively.
fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut total = 0;
    if path.is_dir() {
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                total += dir_size(&path)?;
            } else {
                total += entry.metadata()?.len();
            }
        }
    }
    Ok(total)
}
