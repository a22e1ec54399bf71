//! OCI image metadata loading.
//!
//! Reads the image index, the manifest it references and the image config
//! from an OCI image layout directory.

use oci_spec::image::{Descriptor, ImageIndex, ImageManifest};
use rootprep_core::error::{ProvisionError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::digest::Digest;

/// Schema version required for index and manifest documents.
const SCHEMA_VERSION: u32 = 2;

/// Operating system and architecture an image was built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePlatform {
    pub os: String,
    pub architecture: String,
}

/// Image configuration fields needed to prepare layers.
///
/// Only `rootfs.diff_ids` is required for extraction; `history` and the
/// runtime config are optional in image configs and are not decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub rootfs: RootFs,
}

/// The `rootfs` section of an image config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootFs {
    #[serde(rename = "type", default)]
    pub fs_type: String,
    #[serde(default)]
    pub diff_ids: Vec<String>,
}

/// Contents of the `oci-layout` marker file.
#[derive(Debug, Deserialize)]
struct OciLayout {
    #[serde(rename = "imageLayoutVersion")]
    image_layout_version: String,
}

/// Metadata of an OCI image directory, loaded once and immutable afterwards.
#[derive(Debug, Clone)]
pub struct ImageMetadata {
    /// Root directory of the OCI image layout
    image_dir: PathBuf,

    /// Image manifest
    manifest: ImageManifest,

    /// Image configuration
    config: ImageConfig,
}

impl ImageMetadata {
    /// Load index, manifest and config from an image directory.
    ///
    /// Only the first manifest in the index is used.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::MetadataLoad`] if:
    /// - The layout marker, index.json or blobs directory is missing
    /// - A blob is missing or cannot be decoded
    /// - A schema version is not 2
    /// - The config's diff IDs do not match the manifest layers one to one
    pub fn load(image_dir: impl AsRef<Path>) -> Result<Self> {
        let image_dir = image_dir.as_ref().to_path_buf();

        Self::validate_oci_layout(&image_dir)?;

        let index: ImageIndex = read_json(&image_dir.join("index.json"), "index.json")?;
        if index.schema_version() != SCHEMA_VERSION {
            return Err(ProvisionError::MetadataLoad(format!(
                "unsupported index schema version {}",
                index.schema_version()
            )));
        }

        let manifests = index.manifests();
        let manifest_desc = manifests.first().ok_or_else(|| {
            ProvisionError::MetadataLoad("no manifests in index.json".to_string())
        })?;
        if manifests.len() > 1 {
            tracing::warn!(
                count = manifests.len(),
                digest = %manifest_desc.digest(),
                "index lists several manifests, using the first"
            );
        }

        let manifest: ImageManifest = Self::read_blob(&image_dir, manifest_desc, "manifest")?;
        if manifest.schema_version() != SCHEMA_VERSION {
            return Err(ProvisionError::MetadataLoad(format!(
                "unsupported manifest schema version {}",
                manifest.schema_version()
            )));
        }

        let config: ImageConfig = Self::read_blob(&image_dir, manifest.config(), "config")?;

        let layers = manifest.layers().len();
        let diff_ids = config.rootfs.diff_ids.len();
        if layers != diff_ids {
            return Err(ProvisionError::MetadataLoad(format!(
                "manifest lists {} layers but config lists {} diff IDs",
                layers, diff_ids
            )));
        }

        tracing::debug!(
            image = %image_dir.display(),
            layers,
            os = %config.os,
            architecture = %config.architecture,
            "Loaded OCI image metadata"
        );

        Ok(Self {
            image_dir,
            manifest,
            config,
        })
    }

    /// Root directory of the image layout.
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// The decoded manifest.
    pub fn manifest(&self) -> &ImageManifest {
        &self.manifest
    }

    /// The decoded image config.
    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    /// Layer descriptors, bottom to top.
    pub fn layers(&self) -> &[Descriptor] {
        self.manifest.layers()
    }

    /// Diff IDs, in the same order as [`Self::layers`].
    pub fn diff_ids(&self) -> &[String] {
        &self.config.rootfs.diff_ids
    }

    /// Platform the image targets.
    pub fn platform(&self) -> ImagePlatform {
        ImagePlatform {
            os: self.config.os.clone(),
            architecture: self.config.architecture.clone(),
        }
    }

    /// Path of a blob inside the content-addressed store.
    pub fn blob_path(&self, digest: &Digest) -> PathBuf {
        blob_path(&self.image_dir, digest)
    }

    /// Check the directory carries an OCI layout marker, an index and blobs.
    fn validate_oci_layout(image_dir: &Path) -> Result<()> {
        let layout: OciLayout = read_json(&image_dir.join("oci-layout"), "oci-layout")?;
        if layout.image_layout_version.is_empty() {
            return Err(ProvisionError::MetadataLoad(format!(
                "empty imageLayoutVersion in {}",
                image_dir.join("oci-layout").display()
            )));
        }

        if !image_dir.join("index.json").is_file() {
            return Err(ProvisionError::MetadataLoad(format!(
                "missing index.json in {}",
                image_dir.display()
            )));
        }

        if !image_dir.join("blobs").is_dir() {
            return Err(ProvisionError::MetadataLoad(format!(
                "missing blobs directory in {}",
                image_dir.display()
            )));
        }

        Ok(())
    }

    fn read_blob<T: DeserializeOwned>(
        image_dir: &Path,
        descriptor: &Descriptor,
        what: &str,
    ) -> Result<T> {
        let digest = Digest::parse(descriptor.digest()).map_err(|e| {
            ProvisionError::MetadataLoad(format!("{} descriptor: {}", what, e))
        })?;
        read_json(&blob_path(image_dir, &digest), what)
    }
}

/// Path of a blob: `<image_dir>/blobs/<algorithm>/<hex>`.
pub fn blob_path(image_dir: &Path, digest: &Digest) -> PathBuf {
    image_dir
        .join("blobs")
        .join(digest.algorithm())
        .join(digest.hex())
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ProvisionError::MetadataLoad(format!(
            "failed to read {} at {}: {}",
            what,
            path.display(),
            e
        ))
    })?;

    serde_json::from_str(&content)
        .map_err(|e| ProvisionError::MetadataLoad(format!("failed to parse {}: {}", what, e)))
}
