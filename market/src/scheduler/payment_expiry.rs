//! Periodic sweep cancelling orders whose payment window lapsed.

use chrono::Duration as ChronoDuration;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{PAYMENT_EXPIRY_INTERVAL_SECS, PAYMENT_WINDOW_HOURS};
use crate::error::MarketResult;
use crate::marketplace::OrderStatus;
use crate::traits::{ChangeSet, MarketStore, TimeProvider};

/// Cancels `PendingPayment` orders older than the payment window.
pub struct PaymentExpirer<S, C>
where
    S: MarketStore,
    C: TimeProvider,
{
    store: S,
    time: C,
}

impl<S, C> PaymentExpirer<S, C>
where
    S: MarketStore,
    C: TimeProvider,
{
    pub fn new(store: S, time: C) -> Self {
        Self { store, time }
    }

    /// One sweep over the stale orders. Returns how many were cancelled;
    /// per-order failures are logged and skipped.
    pub async fn run_once(&self) -> MarketResult<usize> {
        let cutoff = self.time.now() - ChronoDuration::hours(PAYMENT_WINDOW_HOURS);
        let stale = self.store.unpaid_orders_before(cutoff).await?;
        let mut cancelled = 0;

        for mut order in stale {
            // The query can race a payment; only cancel what is still
            // unpaid.
            if order.status != OrderStatus::PendingPayment {
                continue;
            }
            info!(order = %order.id, "cancelling unpaid order");
            order.status = OrderStatus::Cancelled;
            let order_id = order.id;
            let changes = ChangeSet {
                orders: vec![order],
                ..Default::default()
            };
            match self.store.commit(changes).await {
                Ok(()) => cancelled += 1,
                Err(e) => error!(order = %order_id, "failed to cancel order: {e}"),
            }
        }

        Ok(cancelled)
    }

    /// Run sweeps on the configured interval until cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(PAYMENT_EXPIRY_INTERVAL_SECS));
        info!("payment expirer started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("payment expirer stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!("payment expiry sweep failed: {e}");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::{ItemId, Order, OrderType, UserId};
    use crate::mocks::MockTime;
    use crate::storage::MemoryStore;
    use crate::traits::TimeProvider;
    use rust_decimal_macros::dec;

    async fn seed_order(store: &MemoryStore, time: &MockTime) -> Order {
        let order = Order::new(
            ItemId::new(),
            UserId::new(),
            UserId::new(),
            OrderType::AuctionWin,
            dec!(100),
            time.now(),
        );
        store
            .commit(ChangeSet {
                orders: vec![order.clone()],
                ..Default::default()
            })
            .await
            .unwrap();
        order
    }

    #[tokio::test]
    async fn test_cancels_only_stale_orders() {
        let store = MemoryStore::new();
        let time = MockTime::at_unix(1_000);
        let expirer = PaymentExpirer::new(store.clone(), time.clone());

        let stale = seed_order(&store, &time).await;
        time.advance_secs(23 * 3_600);
        let fresh = seed_order(&store, &time).await;
        time.advance_secs(2 * 3_600);

        // The first order is now 25h old, the second only 2h.
        assert_eq!(expirer.run_once().await.unwrap(), 1);

        let stored = store.order(stale.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
        let stored = store.order(fresh.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::PendingPayment);
    }

    #[tokio::test]
    async fn test_paid_order_is_left_alone() {
        let store = MemoryStore::new();
        let time = MockTime::at_unix(1_000);
        let expirer = PaymentExpirer::new(store.clone(), time.clone());

        let mut order = seed_order(&store, &time).await;
        order.status = OrderStatus::Paid;
        store
            .commit(ChangeSet {
                orders: vec![order.clone()],
                ..Default::default()
            })
            .await
            .unwrap();

        time.advance_secs(48 * 3_600);
        assert_eq!(expirer.run_once().await.unwrap(), 0);

        let stored = store.order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let store = MemoryStore::new();
        let time = MockTime::at_unix(1_000);
        let expirer = PaymentExpirer::new(store.clone(), time.clone());

        seed_order(&store, &time).await;
        time.advance_secs(25 * 3_600);

        assert_eq!(expirer.run_once().await.unwrap(), 1);
        assert_eq!(expirer.run_once().await.unwrap(), 0);
    }
}
