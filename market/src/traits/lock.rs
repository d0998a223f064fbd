//! Expiring key-value abstraction backing the distributed lock.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A shared key-value store with expiring entries.
///
/// Implementations are expected to be visible to every service instance
/// (Redis and friends); [`crate::storage::MemoryLockStore`] is the
/// process-local reference used in tests and the simulator.
#[async_trait]
pub trait LockStore: Send + Sync + Clone {
    /// Conditionally create `key` with a time-to-live.
    ///
    /// Returns `false` if a live entry already exists. An expired entry
    /// counts as absent.
    async fn put_if_absent(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Unconditionally delete `key`. Deleting an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
