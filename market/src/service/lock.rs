//! Distributed mutual exclusion over an expiring key-value store.
//!
//! The lease is a safety net, not the primary release path: if a holder
//! crashes without releasing, the entry still expires and other holders
//! may proceed. Across a crash boundary exclusion is therefore "probably
//! exclusive" rather than strict; callers release explicitly on every
//! normal exit path.

use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

use crate::config::LOCK_RETRY_INTERVAL_MS;
use crate::error::{MarketError, MarketResult};
use crate::traits::LockStore;

/// Mutual exclusion keyed by string, shared by every service instance
/// through the backing [`LockStore`].
#[derive(Debug, Clone)]
pub struct DistributedLock<L: LockStore> {
    store: L,
}

impl<L: LockStore> DistributedLock<L> {
    pub fn new(store: L) -> Self {
        Self { store }
    }

    /// Try to acquire the lock for `key` once.
    ///
    /// Returns `false` if someone else holds it. Failure to acquire is a
    /// value, not an error; only a backend fault errors.
    pub async fn acquire(&self, key: &str, lease: Duration) -> MarketResult<bool> {
        self.store
            .put_if_absent(key, lease)
            .await
            .map_err(|e| MarketError::Storage(format!("lock acquire failed for {key}: {e}")))
    }

    /// Release the lock for `key`.
    ///
    /// Infallible from the caller's perspective so it can run on every
    /// exit path; a backend fault is logged and the lease expiry cleans up.
    pub async fn release(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            warn!(key, "failed to release lock, lease will expire: {e}");
        }
    }

    /// Try to acquire the lock for `key`, retrying on a short interval
    /// until `wait` has elapsed.
    ///
    /// Returns `false` once the wait budget runs out.
    pub async fn acquire_with_retry(
        &self,
        key: &str,
        wait: Duration,
        lease: Duration,
    ) -> MarketResult<bool> {
        let deadline = Instant::now() + wait;
        loop {
            if self.acquire(key, lease).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(LOCK_RETRY_INTERVAL_MS)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryLockStore;

    fn make_lock() -> DistributedLock<MemoryLockStore> {
        DistributedLock::new(MemoryLockStore::new())
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let lock = make_lock();

        assert!(lock
            .acquire("auction:1", Duration::from_secs(5))
            .await
            .unwrap());
        assert!(!lock
            .acquire("auction:1", Duration::from_secs(5))
            .await
            .unwrap());

        lock.release("auction:1").await;
        assert!(lock
            .acquire("auction:1", Duration::from_secs(5))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_independent_keys() {
        let lock = make_lock();

        assert!(lock
            .acquire("auction:1", Duration::from_secs(5))
            .await
            .unwrap());
        assert!(lock
            .acquire("auction:2", Duration::from_secs(5))
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_release() {
        let lock = make_lock();
        let contender = lock.clone();

        assert!(lock
            .acquire("auction:1", Duration::from_secs(5))
            .await
            .unwrap());

        let waiter = tokio::spawn(async move {
            contender
                .acquire_with_retry(
                    "auction:1",
                    Duration::from_secs(3),
                    Duration::from_secs(5),
                )
                .await
        });

        // Give the waiter a few retry rounds before releasing.
        tokio::time::sleep(Duration::from_millis(200)).await;
        lock.release("auction:1").await;

        assert!(waiter.await.unwrap().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_wait_budget() {
        let lock = make_lock();

        assert!(lock
            .acquire("auction:1", Duration::from_secs(30))
            .await
            .unwrap());

        let acquired = lock
            .acquire_with_retry("auction:1", Duration::from_secs(1), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!acquired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_wins_after_holder_lease_expires() {
        let lock = make_lock();

        // Simulated crashed holder: acquired with a short lease, never
        // released.
        assert!(lock
            .acquire("auction:1", Duration::from_millis(500))
            .await
            .unwrap());

        let acquired = lock
            .acquire_with_retry("auction:1", Duration::from_secs(3), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(acquired);
    }
}
