//! Distributed producer lock built on the store's conditional primitives.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::CacheError;
use crate::store::Store;

/// Proof of lock ownership: the random payload written into the lock key.
#[derive(Clone, PartialEq, Eq)]
pub struct LockToken(String);

impl LockToken {
    fn generate() -> Self {
        LockToken(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LockToken").field(&self.0).finish()
    }
}

/// Acquires and releases short-lived mutual-exclusion tokens.
///
/// The lock TTL bounds how long a crashed holder can block other producers.
#[derive(Clone)]
pub struct LockCoordinator {
    store: Arc<dyn Store>,
    lock_ttl: Duration,
}

impl LockCoordinator {
    pub fn new(store: Arc<dyn Store>, lock_ttl: Duration) -> Self {
        LockCoordinator { store, lock_ttl }
    }

    pub fn lock_ttl(&self) -> Duration {
        self.lock_ttl
    }

    /// Try to take the lock. Returns `None` when someone else holds it.
    pub async fn try_acquire(&self, lock_key: &str) -> Result<Option<LockGuard>, CacheError> {
        let token = LockToken::generate();
        let acquired = self
            .store
            .set_if_absent(lock_key, token.as_bytes(), self.lock_ttl)
            .await?;

        if acquired {
            tracing::debug!(lock_key = %lock_key, "producer lock acquired");
            Ok(Some(LockGuard {
                locks: self.clone(),
                lock_key: lock_key.to_string(),
                token,
                released: false,
            }))
        } else {
            tracing::debug!(lock_key = %lock_key, "producer lock held elsewhere");
            Ok(None)
        }
    }

    /// Release the lock if `token` still owns it.
    ///
    /// Returns `false` when the lock had expired or been taken over, or when
    /// the store could not be reached; the TTL cleans up in that case.
    pub async fn release(&self, lock_key: &str, token: &LockToken) -> bool {
        match self
            .store
            .compare_and_delete(lock_key, token.as_bytes())
            .await
        {
            Ok(true) => {
                tracing::debug!(lock_key = %lock_key, "producer lock released");
                true
            }
            Ok(false) => {
                tracing::warn!(
                    lock_key = %lock_key,
                    "producer lock expired before release; left to its current owner"
                );
                false
            }
            Err(e) => {
                tracing::warn!(
                    lock_key = %lock_key,
                    error = %e,
                    "failed to release producer lock; it will expire after its TTL"
                );
                false
            }
        }
    }
}

/// A held producer lock.
///
/// Dropping the guard without calling `release`, e.g. when the owning future
/// is dropped by a timeout, schedules the release on the current tokio
/// runtime. Outside a runtime the lock is left to expire after its TTL.
pub struct LockGuard {
    locks: LockCoordinator,
    lock_key: String,
    token: LockToken,
    released: bool,
}

impl LockGuard {
    pub fn lock_key(&self) -> &str {
        &self.lock_key
    }

    pub fn token(&self) -> &LockToken {
        &self.token
    }

    /// Release the lock now. See `LockCoordinator::release`.
    pub async fn release(mut self) -> bool {
        let released = self.locks.release(&self.lock_key, &self.token).await;
        self.released = true;
        released
    }
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("lock_key", &self.lock_key)
            .field("token", &self.token)
            .finish()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let locks = self.locks.clone();
        let lock_key = std::mem::take(&mut self.lock_key);
        let token = self.token.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(lock_key = %lock_key, "producer lock dropped; releasing in background");
                handle.spawn(async move {
                    locks.release(&lock_key, &token).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    lock_key = %lock_key,
                    "producer lock dropped outside a runtime; it will expire after its TTL"
                );
            }
        }
    }
}
