//! Builder API for creating cache instances.
//!
//! `DistributedCache::new` covers the common case. The builder additionally
//! lets tests and embedders swap the `Sleeper` used by the wait loop.

use std::sync::Arc;

use crate::cache::DistributedCache;
use crate::config::CacheConfig;
use crate::retry::{Sleeper, TokioSleeper};
use crate::store::Store;

/// Builder for `DistributedCache`.
///
/// # Example
///
/// ```ignore
/// use cache_aside::{CacheBuilder, CacheConfig, RedisStore, RedisStoreConfig};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let redis = Arc::new(RedisStore::new(RedisStoreConfig::default()).await?);
///
/// let cache = CacheBuilder::new(redis)
///     .config(
///         CacheConfig::default()
///             .with_key_prefix("myapp:")
///             .with_operation_ttl("Report", Duration::from_secs(600)),
///     )
///     .build();
/// ```
pub struct CacheBuilder {
    store: Arc<dyn Store>,
    config: CacheConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl CacheBuilder {
    /// Start a builder over the given store with default configuration.
    pub fn new(store: Arc<dyn Store>) -> Self {
        CacheBuilder {
            store,
            config: CacheConfig::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the sleeper used between wait-loop polls.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn build(self) -> DistributedCache {
        DistributedCache::with_sleeper(self.store, self.config, self.sleeper)
    }
}
