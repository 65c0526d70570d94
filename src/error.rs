/// Error type for cache operations.
///
/// Producer failures are never wrapped in this type: `get_or_add` hands the
/// producer's own error back to the caller untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The logical cache key (or invalidation pattern) was empty.
    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    /// Communication with the backing store failed.
    #[error("[{store}] store unavailable for key '{key}': {message}")]
    Unavailable {
        store: String,
        key: String,
        message: String,
    },

    /// A stored payload could not be decoded.
    #[error("malformed cache entry: {0}")]
    Malformed(String),

    /// A value could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The caller cancelled the operation.
    #[error("cache operation cancelled")]
    Cancelled,
}

impl CacheError {
    /// Create a new store-unavailable error.
    pub fn unavailable(
        store: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CacheError::Unavailable {
            store: store.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from the store rather than from the caller's input.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CacheError::Unavailable { .. })
    }
}
