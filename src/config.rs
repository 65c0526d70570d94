use std::collections::HashMap;
use std::time::Duration;

use crate::duration::DurationResolver;
use crate::retry::{Backoff, RetryPolicy};

/// Configuration for a `DistributedCache`.
///
/// Store connection settings (URL, database) belong to the store's own config,
/// e.g. `RedisStoreConfig`.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Prepended to every logical key, e.g. `"myapp:"`.
    pub key_prefix: String,

    /// TTL for entries whose operation has no named duration.
    pub default_ttl: Duration,

    /// Per-operation TTLs, keyed by operation name.
    pub operation_ttls: HashMap<String, Duration>,

    /// How long a producer lock lives if its holder never releases it.
    pub lock_ttl: Duration,

    /// Delay between polls while another caller holds the lock.
    pub poll_interval: Duration,

    /// Polls before a waiting caller gives up and produces the value itself.
    pub max_wait_attempts: u32,

    /// Growth of the poll delay.
    pub backoff: Backoff,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        CacheConfig {
            key_prefix: String::new(),
            default_ttl: Duration::from_secs(3600),
            operation_ttls: HashMap::new(),
            lock_ttl: Duration::from_secs(30),
            poll_interval: retry.poll_interval,
            max_wait_attempts: retry.max_attempts,
            backoff: retry.backoff,
        }
    }
}

impl CacheConfig {
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the TTL used for writes made under `operation`
    pub fn with_operation_ttl(mut self, operation: impl Into<String>, ttl: Duration) -> Self {
        self.operation_ttls.insert(operation.into(), ttl);
        self
    }

    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_wait_attempts(mut self, attempts: u32) -> Self {
        self.max_wait_attempts = attempts;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            poll_interval: self.poll_interval,
            max_attempts: self.max_wait_attempts,
            backoff: self.backoff,
        }
    }

    pub fn duration_resolver(&self) -> DurationResolver {
        DurationResolver::with_table(self.default_ttl, self.operation_ttls.clone())
    }
}
