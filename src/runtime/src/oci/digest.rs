//! Content digest and layer descriptor validation.
//!
//! Every layer descriptor passes through [`validate_layer_descriptor`] before
//! anything touches the layer store.

use std::fmt;
use std::str::FromStr;

use oci_spec::image::Descriptor;
use rootprep_core::error::{ProvisionError, Result};

/// The only digest algorithm accepted in an image directory.
pub const SHA256: &str = "sha256";

const SHA256_HEX_LEN: usize = 64;

/// Media type suffixes meaning "tar archive, gzip-compressed".
///
/// Both separators have been used by image producers, e.g.
/// `application/vnd.oci.image.layer.v1.tar+gzip` and
/// `application/vnd.docker.image.rootfs.diff.tar.gzip`.
const GZIP_TAR_SUFFIXES: [&str; 2] = [".tar+gzip", ".tar.gzip"];

/// A validated `sha256:<hex>` content digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: String,
    hex: String,
}

impl Digest {
    /// Parse and validate a digest string.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |reason: &str| ProvisionError::InvalidDigestFormat {
            digest: s.to_string(),
            reason: reason.to_string(),
        };

        let (algorithm, hex) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected <algorithm>:<hex>"))?;

        if algorithm.is_empty() || hex.is_empty() {
            return Err(invalid("expected <algorithm>:<hex>"));
        }
        if algorithm != SHA256 {
            return Err(invalid(&format!("unsupported algorithm {}", algorithm)));
        }
        if hex.len() != SHA256_HEX_LEN {
            return Err(invalid(&format!(
                "expected {} hex characters, found {}",
                SHA256_HEX_LEN,
                hex.len()
            )));
        }
        if !hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(invalid("encoded part is not lowercase hex"));
        }

        Ok(Self {
            algorithm: algorithm.to_string(),
            hex: hex.to_string(),
        })
    }

    /// Algorithm part, e.g. `sha256`.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Encoded hash, independent of the algorithm prefix.
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// The layer identifier derived from this digest.
    pub fn layer_id(&self) -> String {
        self.hex.clone()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl FromStr for Digest {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Check that `media_type` names a gzip-compressed tar archive.
pub fn validate_layer_media_type(media_type: &str) -> Result<()> {
    if GZIP_TAR_SUFFIXES
        .iter()
        .any(|suffix| media_type.ends_with(suffix))
    {
        Ok(())
    } else {
        Err(ProvisionError::UnsupportedMediaType(media_type.to_string()))
    }
}

/// Validate a layer descriptor: digest first, then media type.
pub fn validate_layer_descriptor(descriptor: &Descriptor) -> Result<Digest> {
    let digest = Digest::parse(descriptor.digest())?;
    validate_layer_media_type(&descriptor.media_type().to_string())?;
    Ok(digest)
}
