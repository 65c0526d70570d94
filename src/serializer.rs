use serde::{Serialize, de::DeserializeOwned};

use crate::error::CacheError;

/// JSON transport encoding for cached values.
///
/// Decode failures are always reported as `CacheError::Malformed` so the
/// orchestrator can tell a corrupt entry apart from a store outage.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn encode<V: Serialize>(&self, value: &V) -> Result<Vec<u8>, CacheError> {
        serde_json::to_vec(value)
            .map_err(|e| CacheError::Serialization(format!("Serialization failed: {}", e)))
    }

    pub fn decode<V: DeserializeOwned>(&self, bytes: &[u8]) -> Result<V, CacheError> {
        serde_json::from_slice(bytes)
            .map_err(|e| CacheError::Malformed(format!("Deserialization failed: {}", e)))
    }
}
