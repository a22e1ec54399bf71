//! Image manager: reconciles an image's layers against a layer store.
//!
//! For every manifest layer, bottom to top, the manager validates the
//! descriptor, derives the layer identifier and its parent chain from the
//! manifest position, and asks the store for the layer's state:
//!
//! | state        | action                  |
//! |--------------|-------------------------|
//! | `Valid`      | skip                    |
//! | `Incomplete` | delete, then extract    |
//! | `Absent`     | extract                 |
//!
//! Parent chains are never read back from the store, so a partially built
//! store can be resumed from any point by calling [`ImageManager::extract`]
//! again.

use rootprep_core::error::{ProvisionError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::digest::{validate_layer_descriptor, Digest};
use super::image::ImageMetadata;
use crate::layer::{LayerState, LayerStore};

/// State of one manifest layer in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerStatus {
    /// Layer identifier
    pub layer_id: String,
    /// Position in the manifest, 0 = base layer
    pub index: usize,
    /// State reported by the store
    pub state: LayerState,
}

/// Drives extraction of an OCI image directory into a layer store.
///
/// Metadata is loaded by [`ImageManager::load_metadata`], or lazily by the
/// first call that needs it, and is kept for the lifetime of the manager.
/// Use one manager per image extraction.
pub struct ImageManager<S: LayerStore> {
    image_dir: PathBuf,
    store: S,
    output: Box<dyn Write + Send>,
    metadata: Option<ImageMetadata>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<S: LayerStore> ImageManager<S> {
    /// Create a manager for `image_dir`.
    ///
    /// Progress lines are written to `output`; pass [`std::io::sink`] to
    /// discard them.
    pub fn new(
        image_dir: impl Into<PathBuf>,
        store: S,
        output: impl Write + Send + 'static,
    ) -> Self {
        Self {
            image_dir: image_dir.into(),
            store,
            output: Box::new(output),
            metadata: None,
            cancel: None,
        }
    }

    /// Abort between layers once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// The image directory.
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// The layer store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loaded metadata, if any.
    pub fn metadata(&self) -> Option<&ImageMetadata> {
        self.metadata.as_ref()
    }

    /// Load index, manifest and config. A no-op once loaded.
    pub fn load_metadata(&mut self) -> Result<&ImageMetadata> {
        if self.metadata.is_none() {
            self.metadata = Some(ImageMetadata::load(&self.image_dir)?);
        }
        self.metadata
            .as_ref()
            .ok_or_else(|| ProvisionError::MetadataLoad("metadata not loaded".to_string()))
    }

    /// Extract every layer that is not already valid.
    ///
    /// Returns the identifier of the top layer. Any invalid descriptor or
    /// store failure aborts the call; layers reconciled before the failure
    /// stay as they are, and calling `extract` again resumes.
    pub fn extract(&mut self) -> Result<String> {
        let metadata = self.take_metadata()?;
        let result = self.reconcile(&metadata);
        self.metadata = Some(metadata);
        result
    }

    /// Report the store state of every manifest layer without changing it.
    pub fn layer_states(&mut self) -> Result<Vec<LayerStatus>> {
        let metadata = self.load_metadata()?;
        let descriptors = metadata.layers().to_vec();

        descriptors
            .iter()
            .enumerate()
            .map(|(index, descriptor)| {
                let layer_id = validate_layer_descriptor(descriptor)?.layer_id();
                let state = self.store.state(&layer_id)?;
                Ok(LayerStatus {
                    layer_id,
                    index,
                    state,
                })
            })
            .collect()
    }

    fn take_metadata(&mut self) -> Result<ImageMetadata> {
        match self.metadata.take() {
            Some(metadata) => Ok(metadata),
            None => ImageMetadata::load(&self.image_dir),
        }
    }

    fn reconcile(&mut self, metadata: &ImageMetadata) -> Result<String> {
        let layers = metadata.layers();
        let total = layers.len();

        tracing::info!(
            image = %self.image_dir.display(),
            layers = total,
            "Reconciling image layers"
        );

        // Identifiers of the layers processed so far, bottom to top.
        let mut stacked: Vec<String> = Vec::with_capacity(total);

        for (index, descriptor) in layers.iter().enumerate() {
            self.check_cancelled()?;

            let digest = validate_layer_descriptor(descriptor)?;
            let layer_id = digest.layer_id();
            let parents: Vec<String> = stacked.iter().rev().cloned().collect();

            match self.store.state(&layer_id)? {
                LayerState::Valid => {
                    self.progress(format_args!(
                        "layer {} already extracted ({}/{})",
                        layer_id,
                        index + 1,
                        total
                    ));
                    tracing::debug!(layer = %layer_id, index, "Layer valid, skipping");
                }
                LayerState::Incomplete => {
                    self.progress(format_args!("removing incomplete layer {}", layer_id));
                    tracing::warn!(layer = %layer_id, index, "Layer incomplete, re-extracting");
                    self.store.delete(&layer_id)?;
                    self.extract_layer(metadata, &digest, &layer_id, &parents, index, total)?;
                }
                LayerState::Absent => {
                    self.extract_layer(metadata, &digest, &layer_id, &parents, index, total)?;
                }
            }

            stacked.push(layer_id);
        }

        let top = stacked
            .pop()
            .ok_or_else(|| ProvisionError::MetadataLoad("manifest has no layers".to_string()))?;

        tracing::info!(top_layer = %top, "Image layers ready");
        Ok(top)
    }

    fn extract_layer(
        &mut self,
        metadata: &ImageMetadata,
        digest: &Digest,
        layer_id: &str,
        parents: &[String],
        index: usize,
        total: usize,
    ) -> Result<()> {
        let archive = metadata.blob_path(digest);
        self.progress(format_args!(
            "extracting layer {} ({}/{})",
            layer_id,
            index + 1,
            total
        ));
        tracing::debug!(
            layer = %layer_id,
            archive = %archive.display(),
            parents = parents.len(),
            "Extracting layer"
        );
        self.store.extract(&archive, layer_id, parents)
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::SeqCst) => Err(ProvisionError::Cancelled),
            _ => Ok(()),
        }
    }

    fn progress(&mut self, line: std::fmt::Arguments<'_>) {
        let _ = writeln!(self.output, "{}", line);
    }
}
