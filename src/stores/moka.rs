use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::CacheError;
use crate::store::Store;
use crate::utils::{bounded_ttl, glob_to_regex};

/// Configuration for MokaStore.
#[derive(Debug, Clone)]
pub struct MokaStoreConfig {
    /// Maximum number of entries the cache can hold.
    pub max_capacity: u64,
}

impl Default for MokaStoreConfig {
    fn default() -> Self {
        MokaStoreConfig {
            max_capacity: 10_000,
        }
    }
}

#[derive(Clone)]
struct Payload {
    data: Arc<[u8]>,
    ttl: Duration,
}

impl Payload {
    fn new(value: &[u8], ttl: Duration) -> Self {
        Payload {
            data: Arc::from(value),
            ttl,
        }
    }
}

/// Expires every entry after the TTL it was written with. TTLs past
/// `MAX_TTL` never expire.
struct PayloadTtl;

impl Expiry<String, Payload> for PayloadTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Payload,
        _created_at: Instant,
    ) -> Option<Duration> {
        bounded_ttl(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Payload,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        bounded_ttl(value.ttl)
    }
}

/// High-performance concurrent store using Moka.
///
/// MokaStore provides:
/// - Lock-free concurrent reads and writes
/// - Per-entry TTL expiry
/// - Atomic conditional writes and compare-and-delete through `and_compute_with`
/// - Size-bounded eviction
///
/// Like `HashMapStore`, coordination only spans the current process.
pub struct MokaStore {
    cache: Cache<String, Payload>,
}

impl MokaStore {
    /// Create a new MokaStore with the given configuration.
    ///
    /// # Example
    /// ```ignore
    /// let store = MokaStore::new(MokaStoreConfig { max_capacity: 50_000 });
    /// ```
    pub fn new(config: MokaStoreConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PayloadTtl)
            .build();

        MokaStore { cache }
    }

    /// Get the number of entries (for monitoring/debugging).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MokaStore {
    fn default() -> Self {
        Self::new(MokaStoreConfig::default())
    }
}

#[async_trait]
impl Store for MokaStore {
    fn name(&self) -> &'static str {
        "moka"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.cache.get(key).await.map(|payload| payload.data.to_vec()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        self.cache
            .insert(key.to_string(), Payload::new(value, ttl))
            .await;
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let payload = Payload::new(value, ttl);
        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|existing| {
                let op = match existing {
                    Some(_) => Op::Nop,
                    None => Op::Put(payload),
                };
                std::future::ready(op)
            })
            .await;

        Ok(matches!(result, CompResult::Inserted(_)))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn compare_and_delete(&self, key: &str, expected: &[u8]) -> Result<bool, CacheError> {
        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|existing| {
                let op = match existing {
                    Some(entry) if entry.value().data.as_ref() == expected => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        Ok(matches!(result, CompResult::Removed(_)))
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let matcher = glob_to_regex(pattern)?;
        Ok(self
            .cache
            .iter()
            .filter(|(key, _)| matcher.is_match(key))
            .map(|(key, _)| key.as_ref().clone())
            .collect())
    }
}
