use futures::FutureExt;
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::CacheConfig;
use crate::duration::DurationResolver;
use crate::error::CacheError;
use crate::keyspace::{CacheKeys, KeySpace};
use crate::lock::{LockCoordinator, LockGuard};
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::serializer::JsonSerializer;
use crate::store::Store;

/// Result of reading one key from the store.
enum Lookup<T> {
    Hit(T),
    Miss,
    /// The entry failed to decode and has been deleted.
    Malformed,
    Unavailable(CacheError),
}

/// Result of waiting for another caller's producer.
enum WaitOutcome<V> {
    Hit(V),
    /// The wait budget ran out with the lock still contended.
    Exhausted,
    /// The store failed while polling.
    Degraded(CacheError),
}

/// Run `fut` unless `cancel` fires first.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, CacheError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CacheError::Cancelled),
        output = fut => Ok(output),
    }
}

/// Cache-aside over a shared store with distributed stampede protection.
///
/// Concurrent `get_or_add` calls for the same key, from this process or any
/// other process sharing the store, run the producer at most once while the
/// lock holder finishes within the waiters' retry budget. Store outages and
/// corrupt entries degrade to calling the producer directly.
///
/// `DistributedCache` is type-agnostic: one instance serves values of any
/// `Serialize + DeserializeOwned` type.
#[derive(Clone)]
pub struct DistributedCache {
    store: Arc<dyn Store>,
    keyspace: KeySpace,
    durations: DurationResolver,
    locks: LockCoordinator,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    serializer: JsonSerializer,
}

impl DistributedCache {
    /// Create a cache over `store` that sleeps on the tokio timer.
    ///
    /// Use `CacheBuilder` to inject a different `Sleeper`.
    pub fn new(store: Arc<dyn Store>, config: CacheConfig) -> Self {
        Self::with_sleeper(store, config, Arc::new(TokioSleeper))
    }

    pub(crate) fn with_sleeper(
        store: Arc<dyn Store>,
        config: CacheConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        DistributedCache {
            locks: LockCoordinator::new(store.clone(), config.lock_ttl),
            keyspace: KeySpace::new(config.key_prefix.clone()),
            durations: config.duration_resolver(),
            retry: config.retry_policy(),
            store,
            sleeper,
            serializer: JsonSerializer,
        }
    }

    pub fn keyspace(&self) -> &KeySpace {
        &self.keyspace
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Get the cached value or produce, cache and return it.
    ///
    /// The producer receives the logical key. Returning `Ok(None)` means there
    /// is nothing to cache: the call returns `None` and writes nothing.
    /// Producer errors are returned to the caller unchanged, after the
    /// producer lock has been released. Cache-side failures never surface
    /// here, except `InvalidKey` and `Cancelled`, which are converted into `E`.
    ///
    /// `operation` selects the TTL of the written entry (see `CacheConfig::operation_ttls`).
    ///
    /// # Example
    /// ```ignore
    /// let report = cache
    ///     .get_or_add("report:Q1", "Report", &cancel, |_key| async {
    ///         build_report().await.map(Some)
    ///     })
    ///     .await?;
    /// ```
    pub async fn get_or_add<V, F, Fut, E>(
        &self,
        key: &str,
        operation: &str,
        cancel: &CancellationToken,
        produce: F,
    ) -> Result<Option<V>, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
        E: From<CacheError>,
    {
        let keys = self.keyspace.derive(key)?;

        match cancellable(cancel, self.lookup::<V>(&keys.store_key)).await? {
            Lookup::Hit(value) => {
                tracing::debug!(key = %keys.store_key, "cache hit");
                return Ok(Some(value));
            }
            Lookup::Unavailable(err) => {
                tracing::error!(
                    key = %keys.store_key,
                    error = %err,
                    "cache read failed; producing without cache"
                );
                return produce_uncached(key, cancel, produce).await;
            }
            Lookup::Miss | Lookup::Malformed => {}
        }

        // Acquisition runs to completion; cancellation is observed after it.
        match self.locks.try_acquire(&keys.lock_key).await {
            Ok(Some(guard)) => {
                self.produce_under_lock(key, &keys, guard, operation, cancel, produce)
                    .await
            }
            Ok(None) => match self.wait_for_holder::<V>(&keys, cancel).await? {
                WaitOutcome::Hit(value) => Ok(Some(value)),
                WaitOutcome::Exhausted => {
                    tracing::warn!(
                        key = %keys.store_key,
                        attempts = self.retry.max_attempts,
                        "lock still held after wait budget; producing without lock"
                    );
                    produce_uncached(key, cancel, produce).await
                }
                WaitOutcome::Degraded(err) => {
                    tracing::error!(
                        key = %keys.store_key,
                        error = %err,
                        "cache read failed while waiting; producing without cache"
                    );
                    produce_uncached(key, cancel, produce).await
                }
            },
            Err(err) => {
                tracing::error!(
                    key = %keys.lock_key,
                    error = %err,
                    "lock acquisition failed; producing without cache"
                );
                produce_uncached(key, cancel, produce).await
            }
        }
    }

    /// Return the cached value.
    ///
    /// Misses, corrupt entries and store failures all read as `None`.
    pub async fn get<V>(&self, key: &str) -> Result<Option<V>, CacheError>
    where
        V: DeserializeOwned,
    {
        let keys = self.keyspace.derive(key)?;

        match self.lookup::<V>(&keys.store_key).await {
            Lookup::Hit(value) => Ok(Some(value)),
            Lookup::Miss | Lookup::Malformed => Ok(None),
            Lookup::Unavailable(err) => {
                tracing::error!(key = %keys.store_key, error = %err, "cache read failed; treating as miss");
                Ok(None)
            }
        }
    }

    /// Write the value, replacing any existing entry.
    pub async fn set<V>(&self, key: &str, value: &V, operation: &str) -> Result<(), CacheError>
    where
        V: Serialize,
    {
        let keys = self.keyspace.derive(key)?;
        let bytes = self.serializer.encode(value)?;
        self.store
            .set(&keys.store_key, &bytes, self.durations.resolve(operation))
            .await
    }

    /// Return the raw payload stored for the key.
    ///
    /// Store failures read as `None`, as in `get`.
    pub async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let keys = self.keyspace.derive(key)?;

        match self.read(&keys.store_key).await {
            Lookup::Hit(bytes) => Ok(Some(bytes)),
            Lookup::Miss | Lookup::Malformed => Ok(None),
            Lookup::Unavailable(err) => {
                tracing::error!(key = %keys.store_key, error = %err, "cache read failed; treating as miss");
                Ok(None)
            }
        }
    }

    /// Write an already-encoded payload, bypassing the serializer.
    pub async fn set_raw(&self, key: &str, value: &[u8], operation: &str) -> Result<(), CacheError> {
        let keys = self.keyspace.derive(key)?;
        self.store
            .set(&keys.store_key, value, self.durations.resolve(operation))
            .await
    }

    /// Removes the key from the cache.
    pub async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let keys = self.keyspace.derive(key)?;
        self.store.delete(&keys.store_key).await
    }

    /// Remove every entry whose logical key matches the glob pattern.
    ///
    /// The key prefix is matched literally; see `Store::list_keys` for the
    /// glob syntax of `pattern`. Producer locks are never removed, so
    /// invalidation cannot let a second producer in while one is running.
    /// Returns the number of removed entries.
    pub async fn remove_by_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
        let pattern = self.keyspace.pattern(pattern)?;
        let keys = self.store.list_keys(&pattern).await?;

        let mut removed = 0;
        for key in keys.iter().filter(|key| !KeySpace::is_lock_key(key)) {
            self.store.delete(key).await?;
            removed += 1;
        }

        tracing::debug!(pattern = %pattern, removed, "removed entries by pattern");
        Ok(removed)
    }

    async fn read(&self, store_key: &str) -> Lookup<Vec<u8>> {
        match self.store.get(store_key).await {
            Ok(Some(bytes)) => Lookup::Hit(bytes),
            Ok(None) => Lookup::Miss,
            Err(err) => Lookup::Unavailable(err),
        }
    }

    async fn lookup<V>(&self, store_key: &str) -> Lookup<V>
    where
        V: DeserializeOwned,
    {
        let bytes = match self.read(store_key).await {
            Lookup::Hit(bytes) => bytes,
            Lookup::Miss => return Lookup::Miss,
            Lookup::Malformed => return Lookup::Malformed,
            Lookup::Unavailable(err) => return Lookup::Unavailable(err),
        };

        let err = match self.serializer.decode::<V>(&bytes) {
            Ok(value) => return Lookup::Hit(value),
            Err(err) => err,
        };

        tracing::warn!(key = %store_key, error = %err, "discarding malformed cache entry");
        if let Err(e) = self.store.delete(store_key).await {
            tracing::warn!(key = %store_key, error = %e, "failed to delete malformed cache entry");
        }
        Lookup::Malformed
    }

    async fn produce_under_lock<V, F, Fut, E>(
        &self,
        key: &str,
        keys: &CacheKeys,
        guard: LockGuard,
        operation: &str,
        cancel: &CancellationToken,
        produce: F,
    ) -> Result<Option<V>, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
        E: From<CacheError>,
    {
        let outcome = AssertUnwindSafe(self.fill(key, keys, operation, cancel, produce))
            .catch_unwind()
            .await;

        guard.release().await;

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Double-check, produce and write. Runs while holding the producer lock.
    async fn fill<V, F, Fut, E>(
        &self,
        key: &str,
        keys: &CacheKeys,
        operation: &str,
        cancel: &CancellationToken,
        produce: F,
    ) -> Result<Option<V>, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
        E: From<CacheError>,
    {
        let cacheable = match cancellable(cancel, self.lookup::<V>(&keys.store_key)).await? {
            Lookup::Hit(value) => {
                tracing::debug!(key = %keys.store_key, "cache hit after lock");
                return Ok(Some(value));
            }
            Lookup::Miss | Lookup::Malformed => true,
            Lookup::Unavailable(err) => {
                tracing::error!(
                    key = %keys.store_key,
                    error = %err,
                    "cache re-read failed under lock; result will not be cached"
                );
                false
            }
        };

        let Some(value) = cancellable(cancel, produce(key.to_string())).await?? else {
            tracing::debug!(key = %keys.store_key, "producer returned no value; nothing cached");
            return Ok(None);
        };

        if !cacheable {
            return Ok(Some(value));
        }
        if cancel.is_cancelled() {
            return Err(CacheError::Cancelled.into());
        }

        let ttl = self.durations.resolve(operation);
        match self.serializer.encode(&value) {
            Ok(bytes) => self.write(&keys.store_key, bytes, ttl).await,
            Err(err) => {
                tracing::warn!(
                    key = %keys.store_key,
                    error = %err,
                    "failed to encode produced value; returning it uncached"
                );
            }
        }

        Ok(Some(value))
    }

    async fn write(&self, store_key: &str, bytes: Vec<u8>, ttl: Duration) {
        match self.store.set(store_key, &bytes, ttl).await {
            Ok(()) => {
                tracing::debug!(
                    key = %store_key,
                    ttl_ms = ttl.as_millis() as u64,
                    "cached produced value"
                );
            }
            Err(err) => {
                tracing::warn!(
                    key = %store_key,
                    error = %err,
                    "failed to cache produced value; returning it uncached"
                );
            }
        }
    }

    /// Poll for the entry another caller is producing.
    async fn wait_for_holder<V>(
        &self,
        keys: &CacheKeys,
        cancel: &CancellationToken,
    ) -> Result<WaitOutcome<V>, CacheError>
    where
        V: DeserializeOwned,
    {
        for attempt in 1..=self.retry.max_attempts {
            cancellable(cancel, self.sleeper.sleep(self.retry.delay(attempt))).await?;

            match cancellable(cancel, self.lookup::<V>(&keys.store_key)).await? {
                Lookup::Hit(value) => {
                    tracing::debug!(key = %keys.store_key, attempt, "cache hit after waiting");
                    return Ok(WaitOutcome::Hit(value));
                }
                Lookup::Miss | Lookup::Malformed => {}
                Lookup::Unavailable(err) => return Ok(WaitOutcome::Degraded(err)),
            }
        }

        Ok(WaitOutcome::Exhausted)
    }
}

/// Call the producer without the lock and without writing its result.
async fn produce_uncached<V, F, Fut, E>(
    key: &str,
    cancel: &CancellationToken,
    produce: F,
) -> Result<Option<V>, E>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<Option<V>, E>>,
    E: From<CacheError>,
{
    cancellable(cancel, produce(key.to_string())).await?
}
