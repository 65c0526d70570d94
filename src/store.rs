use async_trait::async_trait;
use std::time::Duration;

use crate::error::CacheError;

/// A store is a common interface for reading, writing and deleting raw payloads
/// in a key-value backend shared by every process that uses the cache.
///
/// All keys passed to a store are full store keys: prefixing and lock-key
/// derivation happen before the store is called.
///
/// The store implementation is responsible for expiring entries once their TTL
/// has elapsed.
#[async_trait]
pub trait Store: Send + Sync {
    /// A name for metrics/tracing.
    ///
    /// # Example
    /// - "hashmap"
    /// - "moka"
    /// - "redis"
    fn name(&self) -> &'static str;

    /// Return the stored payload.
    ///
    /// The response must be `None` for missing or expired keys.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Write the payload unconditionally, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Write the payload only if the key is absent.
    ///
    /// Returns `true` when this call created the key.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, CacheError>;

    /// Removes the key from the store. Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Delete the key only if its current value equals `expected`.
    ///
    /// Must be a single atomic operation inside the store; a read followed by a
    /// delete from the client side races with other writers.
    async fn compare_and_delete(&self, key: &str, expected: &[u8]) -> Result<bool, CacheError>;

    /// List the keys matching a glob pattern.
    ///
    /// Implementations must honour the Redis `MATCH` subset: `*`, `?`,
    /// `[...]` classes (with `^` negation and `a-z` ranges) and `\` escapes.
    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;
}
