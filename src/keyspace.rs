//! Store-key and lock-key derivation.

use crate::error::CacheError;
use crate::utils::escape_glob;

/// Suffix appended to a store key to form its lock key.
pub const LOCK_SUFFIX: &str = ":lock";

/// The pair of store keys derived from one logical cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    /// Key holding the cached payload.
    pub store_key: String,
    /// Key holding the producer lock for `store_key`.
    pub lock_key: String,
}

/// Maps logical cache keys onto the shared store.
///
/// Format: `{prefix}{key}` for entries and `{prefix}{key}:lock` for locks.
#[derive(Debug, Clone, Default)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        KeySpace {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Derive the store key and lock key for a logical key.
    ///
    /// Empty keys, and keys whose store key ends in `LOCK_SUFFIX`, are
    /// rejected before anything reaches the store. The latter would share a
    /// store key with another key's producer lock.
    pub fn derive(&self, key: &str) -> Result<CacheKeys, CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey("cache key must not be empty".to_string()));
        }

        let store_key = format!("{}{}", self.prefix, key);
        if store_key.ends_with(LOCK_SUFFIX) {
            return Err(CacheError::InvalidKey(format!(
                "store key '{}' must not end in '{}'",
                store_key, LOCK_SUFFIX
            )));
        }

        let lock_key = format!("{}{}", store_key, LOCK_SUFFIX);
        Ok(CacheKeys {
            store_key,
            lock_key,
        })
    }

    /// Prefix an invalidation pattern so it only matches keys in this keyspace.
    ///
    /// The prefix is matched literally; glob syntax (`*`, `?`, `[...]`, `\`
    /// escapes) only applies to `pattern`.
    pub fn pattern(&self, pattern: &str) -> Result<String, CacheError> {
        if pattern.is_empty() {
            return Err(CacheError::InvalidKey(
                "invalidation pattern must not be empty".to_string(),
            ));
        }
        Ok(format!("{}{}", escape_glob(&self.prefix), pattern))
    }

    /// Whether a store key is a producer lock rather than a cache entry.
    ///
    /// Exact because `derive` never yields an entry key with this suffix.
    pub fn is_lock_key(store_key: &str) -> bool {
        store_key.ends_with(LOCK_SUFFIX)
    }
}
