//! Periodic sweep closing expired auctions.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::{auction_lock_key, AUCTION_CLOSE_INTERVAL_SECS, LOCK_LEASE_MS};
use crate::error::MarketResult;
use crate::service::auctions::AuctionLifecycle;
use crate::service::lock::DistributedLock;
use crate::traits::{AuctionBroadcaster, EventPublisher, LockStore, MarketStore, TimeProvider};

/// Finds `Active` auctions past their end time and closes them, one lock
/// per auction so concurrent service instances never close the same
/// auction twice.
pub struct AuctionCloser<S, L, C, B, E>
where
    S: MarketStore,
    L: LockStore,
    C: TimeProvider,
    B: AuctionBroadcaster,
    E: EventPublisher,
{
    store: S,
    lock: DistributedLock<L>,
    lifecycle: AuctionLifecycle<S, C, B, E>,
    time: C,
}

impl<S, L, C, B, E> AuctionCloser<S, L, C, B, E>
where
    S: MarketStore,
    L: LockStore,
    C: TimeProvider,
    B: AuctionBroadcaster,
    E: EventPublisher,
{
    pub fn new(
        store: S,
        lock: DistributedLock<L>,
        lifecycle: AuctionLifecycle<S, C, B, E>,
        time: C,
    ) -> Self {
        Self {
            store,
            lock,
            lifecycle,
            time,
        }
    }

    /// One sweep over the expired auctions. Returns how many closed.
    ///
    /// A failure on one auction is logged and does not stop the rest of
    /// the batch.
    pub async fn run_once(&self) -> MarketResult<usize> {
        let now = self.time.now();
        let expired = self.store.expired_active_auctions(now).await?;
        let mut closed = 0;

        for auction in expired {
            let key = auction_lock_key(auction.id);
            match self
                .lock
                .acquire(&key, Duration::from_millis(LOCK_LEASE_MS))
                .await
            {
                Ok(true) => {
                    match self.lifecycle.close_auction(auction.id).await {
                        Ok(()) => closed += 1,
                        Err(e) => {
                            error!(auction = %auction.id, "failed to close auction: {e}");
                        }
                    }
                    self.lock.release(&key).await;
                }
                Ok(false) => {
                    // Another instance (or an in-flight bid) holds the
                    // auction; the next sweep will pick it up.
                    debug!(auction = %auction.id, "auction lock busy, skipping this sweep");
                }
                Err(e) => {
                    error!(auction = %auction.id, "lock acquisition failed: {e}");
                }
            }
        }

        Ok(closed)
    }

    /// Run sweeps on the configured interval until cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(AUCTION_CLOSE_INTERVAL_SECS));
        info!("auction closer started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("auction closer stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!("auction close sweep failed: {e}");
                    }
                }
            }
        }
    }
}
