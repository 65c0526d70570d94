//! Metrics middleware for stores.
//!
//! This module provides a `MetricsStore` wrapper that emits one metric per
//! store call (reads, writes, deletes, lock traffic, scans) to a user-provided
//! sink.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cache_aside::{CacheBuilder, MetricsSink, MetricsStore, RedisStore, RedisStoreConfig, Store};
//!
//! let sink = Arc::new(MyMetricsSink::new());
//!
//! let redis = Arc::new(RedisStore::new(RedisStoreConfig::default()).await?);
//! let store: Arc<dyn Store> = Arc::new(MetricsStore::new(redis, sink.clone()));
//!
//! // Every store call made by the cache is now reported to the sink
//! let cache = CacheBuilder::new(store).build();
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::CacheError;
use crate::store::Store;

/// Metrics emitted by the MetricsStore wrapper.
#[derive(Debug, Clone)]
pub enum StoreMetric {
    /// Emitted on every `get`.
    Read {
        key: String,
        /// Whether the key was found. `false` on errors.
        hit: bool,
        /// Whether the store call failed.
        failed: bool,
        latency_ms: f64,
        /// Name of the wrapped store (from Store::name()).
        store: String,
    },
    /// Emitted on every `set`.
    Write {
        key: String,
        ttl: Duration,
        failed: bool,
        latency_ms: f64,
        store: String,
    },
    /// Emitted on every `delete`.
    Delete {
        key: String,
        failed: bool,
        latency_ms: f64,
        store: String,
    },
    /// Emitted on every `set_if_absent`.
    LockAcquire {
        key: String,
        acquired: bool,
        failed: bool,
        latency_ms: f64,
        store: String,
    },
    /// Emitted on every `compare_and_delete`.
    LockRelease {
        key: String,
        released: bool,
        failed: bool,
        latency_ms: f64,
        store: String,
    },
    /// Emitted on every `list_keys`.
    Scan {
        pattern: String,
        matched: usize,
        failed: bool,
        latency_ms: f64,
        store: String,
    },
}

/// Trait for receiving store metrics.
///
/// # Example
///
/// ```ignore
/// use std::sync::Mutex;
/// use async_trait::async_trait;
/// use cache_aside::{MetricsSink, StoreMetric};
///
/// struct BufferedSink {
///     buffer: Mutex<Vec<StoreMetric>>,
/// }
///
/// #[async_trait]
/// impl MetricsSink for BufferedSink {
///     fn emit(&self, metric: StoreMetric) {
///         self.buffer.lock().unwrap().push(metric);
///     }
///
///     async fn flush(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Emit a single metric.
    ///
    /// This is called synchronously in the hot path of every store call.
    /// Implementations should be fast (e.g., buffer metrics in memory).
    fn emit(&self, metric: StoreMetric);

    /// Flush any buffered metrics.
    async fn flush(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A store wrapper that emits metrics for all operations.
pub struct MetricsStore {
    inner: Arc<dyn Store>,
    sink: Arc<dyn MetricsSink>,
    store_name: String,
}

impl MetricsStore {
    /// Create a new MetricsStore wrapping the given store.
    pub fn new(inner: Arc<dyn Store>, sink: Arc<dyn MetricsSink>) -> Self {
        let store_name = inner.name().to_string();
        MetricsStore {
            inner,
            sink,
            store_name,
        }
    }

    /// Get a reference to the metrics sink.
    pub fn sink(&self) -> &Arc<dyn MetricsSink> {
        &self.sink
    }

    fn elapsed_ms(start: Instant) -> f64 {
        start.elapsed().as_secs_f64() * 1000.0
    }
}

#[async_trait]
impl Store for MetricsStore {
    fn name(&self) -> &'static str {
        "metrics"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let start = Instant::now();
        let result = self.inner.get(key).await;

        self.sink.emit(StoreMetric::Read {
            key: key.to_string(),
            hit: matches!(result, Ok(Some(_))),
            failed: result.is_err(),
            latency_ms: Self::elapsed_ms(start),
            store: self.store_name.clone(),
        });

        result
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let start = Instant::now();
        let result = self.inner.set(key, value, ttl).await;

        self.sink.emit(StoreMetric::Write {
            key: key.to_string(),
            ttl,
            failed: result.is_err(),
            latency_ms: Self::elapsed_ms(start),
            store: self.store_name.clone(),
        });

        result
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let start = Instant::now();
        let result = self.inner.set_if_absent(key, value, ttl).await;

        self.sink.emit(StoreMetric::LockAcquire {
            key: key.to_string(),
            acquired: matches!(result, Ok(true)),
            failed: result.is_err(),
            latency_ms: Self::elapsed_ms(start),
            store: self.store_name.clone(),
        });

        result
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let start = Instant::now();
        let result = self.inner.delete(key).await;

        self.sink.emit(StoreMetric::Delete {
            key: key.to_string(),
            failed: result.is_err(),
            latency_ms: Self::elapsed_ms(start),
            store: self.store_name.clone(),
        });

        result
    }

    async fn compare_and_delete(&self, key: &str, expected: &[u8]) -> Result<bool, CacheError> {
        let start = Instant::now();
        let result = self.inner.compare_and_delete(key, expected).await;

        self.sink.emit(StoreMetric::LockRelease {
            key: key.to_string(),
            released: matches!(result, Ok(true)),
            failed: result.is_err(),
            latency_ms: Self::elapsed_ms(start),
            store: self.store_name.clone(),
        });

        result
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let start = Instant::now();
        let result = self.inner.list_keys(pattern).await;

        self.sink.emit(StoreMetric::Scan {
            pattern: pattern.to_string(),
            matched: result.as_ref().map(Vec::len).unwrap_or(0),
            failed: result.is_err(),
            latency_ms: Self::elapsed_ms(start),
            store: self.store_name.clone(),
        });

        result
    }
}
