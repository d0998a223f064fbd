//! Periodic sweep releasing escrow past its deadline.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ESCROW_RELEASE_INTERVAL_SECS;
use crate::error::MarketResult;
use crate::service::orders::OrderLifecycle;
use crate::traits::{EventPublisher, MarketStore, TimeProvider};

/// Finds `Held` transactions whose release deadline has passed and
/// auto-confirms delivery for their orders.
///
/// The auto-confirm path skips disputed and already-settled orders, so a
/// sweep that overlaps a buyer's manual confirmation does nothing wrong.
pub struct EscrowAutoReleaser<S, C, E>
where
    S: MarketStore,
    C: TimeProvider,
    E: EventPublisher,
{
    store: S,
    orders: OrderLifecycle<S, C, E>,
    time: C,
}

impl<S, C, E> EscrowAutoReleaser<S, C, E>
where
    S: MarketStore,
    C: TimeProvider,
    E: EventPublisher,
{
    pub fn new(store: S, orders: OrderLifecycle<S, C, E>, time: C) -> Self {
        Self {
            store,
            orders,
            time,
        }
    }

    /// One sweep over the due transactions. Returns how many orders were
    /// processed; per-order failures are logged and skipped.
    pub async fn run_once(&self) -> MarketResult<usize> {
        let now = self.time.now();
        let due = self.store.held_txs_past_deadline(now).await?;
        let mut released = 0;

        for tx in due {
            match self.orders.auto_confirm_delivery(tx.order_id).await {
                Ok(()) => released += 1,
                Err(e) => {
                    error!(order = %tx.order_id, "failed to auto-release escrow: {e}");
                }
            }
        }

        Ok(released)
    }

    /// Run sweeps on the configured interval until cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(ESCROW_RELEASE_INTERVAL_SECS));
        info!("escrow auto-releaser started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("escrow auto-releaser stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!("escrow release sweep failed: {e}");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ESCROW_HOLD_DAYS;
    use crate::marketplace::{Item, Order, OrderStatus, UserId};
    use crate::mocks::{MockEventPublisher, MockTime};
    use crate::service::escrow::EscrowLedger;
    use crate::storage::MemoryStore;
    use crate::traits::ChangeSet;
    use rust_decimal_macros::dec;

    struct TestSetup {
        releaser: EscrowAutoReleaser<MemoryStore, MockTime, MockEventPublisher>,
        orders: OrderLifecycle<MemoryStore, MockTime, MockEventPublisher>,
        store: MemoryStore,
        time: MockTime,
        buyer: UserId,
        seller: UserId,
    }

    async fn setup() -> TestSetup {
        let store = MemoryStore::new();
        let time = MockTime::at_unix(1_000);
        let events = MockEventPublisher::new();

        let ledger = EscrowLedger::new(store.clone(), time.clone(), events.clone());
        let orders = OrderLifecycle::new(store.clone(), ledger, time.clone(), events.clone());
        let ledger2 = EscrowLedger::new(store.clone(), time.clone(), events.clone());
        let orders2 = OrderLifecycle::new(store.clone(), ledger2, time.clone(), events.clone());
        let releaser = EscrowAutoReleaser::new(store.clone(), orders2, time.clone());

        TestSetup {
            releaser,
            orders,
            store,
            time,
            buyer: UserId::new(),
            seller: UserId::new(),
        }
    }

    /// A paid and shipped order whose release clock is running.
    async fn shipped_order(s: &TestSetup) -> Order {
        let mut item = Item::new(s.seller, "Figurine");
        item.fixed_price = Some(dec!(100));
        s.store
            .commit(ChangeSet {
                items: vec![item.clone()],
                ..Default::default()
            })
            .await
            .unwrap();

        let order = s.orders.create_order(item.id, s.buyer).await.unwrap();
        s.orders
            .process_payment(order.id, dec!(100), "CARD", "ext-1")
            .await
            .unwrap();
        s.orders
            .ship_order(order.id, "TRACK-1", "UPS")
            .await
            .unwrap();
        order
    }

    #[tokio::test]
    async fn test_releases_only_past_deadline() {
        let s = setup().await;
        let order = shipped_order(&s).await;

        // Deadline not reached.
        assert_eq!(s.releaser.run_once().await.unwrap(), 0);

        s.time.advance_secs((ESCROW_HOLD_DAYS + 1) * 86_400);
        assert_eq!(s.releaser.run_once().await.unwrap(), 1);

        let stored = s.store.order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);

        let seller_wallet = s.store.wallet_for_user(s.seller).await.unwrap().unwrap();
        assert_eq!(seller_wallet.balance, dec!(95.00));
    }

    #[tokio::test]
    async fn test_repeated_sweep_is_harmless() {
        let s = setup().await;
        shipped_order(&s).await;
        s.time.advance_secs((ESCROW_HOLD_DAYS + 1) * 86_400);

        assert_eq!(s.releaser.run_once().await.unwrap(), 1);
        // The transaction left Held, so the next sweep selects nothing.
        assert_eq!(s.releaser.run_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_disputed_order_is_skipped_without_blocking_batch() {
        let s = setup().await;
        let disputed = shipped_order(&s).await;

        let other_buyer = UserId::new();
        let mut item = Item::new(s.seller, "Second lot");
        item.fixed_price = Some(dec!(50));
        s.store
            .commit(ChangeSet {
                items: vec![item.clone()],
                ..Default::default()
            })
            .await
            .unwrap();
        let healthy = s.orders.create_order(item.id, other_buyer).await.unwrap();
        s.orders
            .process_payment(healthy.id, dec!(50), "CARD", "ext-2")
            .await
            .unwrap();
        s.orders
            .ship_order(healthy.id, "TRACK-2", "DHL")
            .await
            .unwrap();

        s.orders
            .report_dispute(disputed.id, "box was empty")
            .await
            .unwrap();

        s.time.advance_secs((ESCROW_HOLD_DAYS + 1) * 86_400);
        // The disputed order's transaction is Disputed, not Held, so only
        // the healthy one is due.
        assert_eq!(s.releaser.run_once().await.unwrap(), 1);

        let stored = s.store.order(disputed.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Disputed);
        let stored = s.store.order(healthy.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
    }
}
