//! OCI image support for rootprep.
//!
//! Reads an OCI image layout and extracts its layers, in order, into a
//! layer store:
//!
//! - Digest and media type validation
//! - Image layout parsing (index, manifest, config)
//! - Layer reconciliation against the store
//!
//! # Layout
//!
//! ```text
//! image/
//! ├── oci-layout           (OCI layout marker)
//! ├── index.json           (Image index)
//! └── blobs/
//!     └── sha256/
//!         ├── <manifest>   (Image manifest)
//!         ├── <config>     (Image configuration)
//!         └── <layers>     (gzip-compressed tar layers)
//! ```

mod digest;
mod image;
pub(crate) mod layers;
mod manager;

#[cfg(test)]
pub(crate) mod testutil;

pub use digest::{validate_layer_descriptor, validate_layer_media_type, Digest, SHA256};
pub use image::{blob_path, ImageConfig, ImageMetadata, ImagePlatform, RootFs};
pub use layers::unpack_layer;
pub use manager::{ImageManager, LayerStatus};
