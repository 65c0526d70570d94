//! cache-aside - Distributed cache-aside with stampede protection
//!
//! This library wraps a shared key-value store (Redis in production, in-memory
//! stores for tests and single-process use) with:
//! - Get-or-produce semantics over JSON-encoded values
//! - A per-key producer lock, so concurrent misses run the producer once
//! - Bounded waiting, falling back to producing directly when the holder stalls
//! - Self-healing of corrupt entries and graceful degradation on store outages
//! - Per-operation TTLs and pattern invalidation
//!
//! # Example
//!
//! ```ignore
//! use cache_aside::{CacheConfig, DistributedCache, RedisStore, RedisStoreConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AppError> {
//!     let redis = Arc::new(RedisStore::new(RedisStoreConfig::new("redis://localhost:6379")).await?);
//!
//!     let cache = DistributedCache::new(
//!         redis,
//!         CacheConfig::default()
//!             .with_key_prefix("reports:")
//!             .with_operation_ttl("Report", Duration::from_secs(600)),
//!     );
//!
//!     // Only one caller across all processes builds the report;
//!     // the others wait for its result
//!     let report = cache
//!         .get_or_add("report:Q1", "Report", &CancellationToken::new(), |key| async move {
//!             build_report(&key).await.map(Some)
//!         })
//!         .await?;
//!
//!     // Drop every cached quarter
//!     cache.remove_by_pattern("report:*").await?;
//!     Ok(())
//! }
//! ```

mod builder;
mod cache;
mod config;
mod duration;
mod error;
mod keyspace;
mod lock;
mod retry;
mod serializer;
mod store;
pub mod stores;
mod utils;

// Re-export public API
pub use builder::CacheBuilder;
pub use cache::DistributedCache;
pub use config::CacheConfig;
pub use duration::DurationResolver;
pub use error::CacheError;
pub use keyspace::{CacheKeys, KeySpace, LOCK_SUFFIX};
pub use lock::{LockCoordinator, LockGuard, LockToken};
pub use retry::{Backoff, RetryPolicy, Sleeper, TokioSleeper};
pub use serializer::JsonSerializer;
pub use store::Store;
pub use stores::memory::{HashMapStore, HashMapStoreConfig};
pub use stores::metrics::{MetricsSink, MetricsStore, StoreMetric};
pub use stores::moka::{MokaStore, MokaStoreConfig};
pub use stores::redis::{RedisStore, RedisStoreConfig};
pub use utils::MAX_TTL;
