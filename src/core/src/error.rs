use thiserror::Error;

/// rootprep error types
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// A descriptor digest is not a well-formed `<algorithm>:<hex>` pair
    #[error("invalid digest format: {digest:?} ({reason})")]
    InvalidDigestFormat { digest: String, reason: String },

    /// A layer declares a media type that is not a gzip-compressed tar
    #[error("invalid layer media type: {0}")]
    UnsupportedMediaType(String),

    /// Index, manifest or config could not be read or decoded
    #[error("failed to load image metadata: {0}")]
    MetadataLoad(String),

    /// Failure reported by a layer store operation
    #[error("layer store error: {layer_id}: {message}")]
    LayerStore { layer_id: String, message: String },

    /// The operation was cancelled between layers
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ProvisionError {
    /// Build a layer store error for `layer_id`.
    pub fn layer_store(layer_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LayerStore {
            layer_id: layer_id.into(),
            message: message.into(),
        }
    }

    /// Whether re-running the whole extraction may succeed without
    /// changing the image directory.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LayerStore { .. } | Self::Io(_) | Self::Cancelled
        )
    }
}

impl From<serde_json::Error> for ProvisionError {
    fn from(err: serde_json::Error) -> Self {
        ProvisionError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for ProvisionError {
    fn from(err: serde_yaml::Error) -> Self {
        ProvisionError::Serialization(err.to_string())
    }
}

/// Result type alias for rootprep operations
pub type Result<T> = std::result::Result<T, ProvisionError>;
