use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::CacheError;
use crate::store::Store;
use crate::utils::{bounded_ttl, glob_to_regex};

/// Configuration for HashMapStore.
#[derive(Debug, Clone, Default)]
pub struct HashMapStoreConfig {
    /// Upper bound on stored keys. When a write pushes the map past it, the
    /// entries closest to expiry are dropped first.
    ///
    /// `None` disables the bound; expired entries are still purged on write.
    pub max_items: Option<usize>,
}

#[derive(Clone)]
struct Slot {
    data: Vec<u8>,
    /// `None` never expires.
    expires_at: Option<Instant>,
}

impl Slot {
    fn new(value: &[u8], ttl: Duration) -> Self {
        Slot {
            data: value.to_vec(),
            expires_at: bounded_ttl(ttl).and_then(|ttl| Instant::now().checked_add(ttl)),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// Thread-safe in-memory store using a HashMap behind a RwLock.
///
/// Conditional operations run under a single write lock, which makes them
/// atomic for every caller sharing this instance. Coordination only spans the
/// current process, so this store suits tests and single-node deployments.
pub struct HashMapStore {
    state: RwLock<HashMap<String, Slot>>,
    max_items: Option<usize>,
}

impl HashMapStore {
    /// Create a new HashMapStore with the given configuration.
    pub fn new(config: HashMapStoreConfig) -> Self {
        HashMapStore {
            state: RwLock::new(HashMap::new()),
            max_items: config.max_items,
        }
    }

    /// Number of live keys, locks included.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let state = self.state.read().await;
        state.values().filter(|slot| slot.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn evict(&self, state: &mut HashMap<String, Slot>) {
        let now = Instant::now();
        state.retain(|_, slot| slot.is_live(now));

        let Some(max_items) = self.max_items else {
            return;
        };
        if state.len() <= max_items {
            return;
        }

        let mut entries: Vec<_> = state
            .iter()
            .map(|(k, slot)| (k.clone(), slot.expires_at))
            .collect();
        // Soonest expiry first; entries without one go last
        entries.sort_by_key(|(_, expires_at)| (expires_at.is_none(), *expires_at));

        let to_remove = state.len() - max_items;
        for (key, _) in entries.into_iter().take(to_remove) {
            state.remove(&key);
        }
    }
}

impl Default for HashMapStore {
    fn default() -> Self {
        Self::new(HashMapStoreConfig::default())
    }
}

#[async_trait]
impl Store for HashMapStore {
    fn name(&self) -> &'static str {
        "hashmap"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        let state = self.state.read().await;

        let Some(slot) = state.get(key) else {
            return Ok(None);
        };

        if !slot.is_live(now) {
            drop(state);
            let mut state = self.state.write().await;
            if state.get(key).is_some_and(|slot| !slot.is_live(now)) {
                state.remove(key);
            }
            return Ok(None);
        }

        Ok(Some(slot.data.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut state = self.state.write().await;
        state.insert(key.to_string(), Slot::new(value, ttl));
        self.evict(&mut state);
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let now = Instant::now();
        let mut state = self.state.write().await;

        if state.get(key).is_some_and(|slot| slot.is_live(now)) {
            return Ok(false);
        }

        state.insert(key.to_string(), Slot::new(value, ttl));
        self.evict(&mut state);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut state = self.state.write().await;
        state.remove(key);
        Ok(())
    }

    async fn compare_and_delete(&self, key: &str, expected: &[u8]) -> Result<bool, CacheError> {
        let now = Instant::now();
        let mut state = self.state.write().await;

        let owned = state
            .get(key)
            .is_some_and(|slot| slot.is_live(now) && slot.data == expected);
        if owned {
            state.remove(key);
        }
        Ok(owned)
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let matcher = glob_to_regex(pattern)?;
        let now = Instant::now();
        let state = self.state.read().await;

        Ok(state
            .iter()
            .filter(|(key, slot)| slot.is_live(now) && matcher.is_match(key))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
