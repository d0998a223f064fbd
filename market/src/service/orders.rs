//! Order lifecycle: purchase, shipment, delivery, disputes, and the admin
//! override, composed with the escrow ledger.

use chrono::Duration;
use tracing::{info, warn};

use crate::config::ESCROW_HOLD_DAYS;
use crate::error::{MarketError, MarketResult};
use crate::events::{DomainEvent, EventKind};
use crate::marketplace::{
    EscrowTransaction, ItemId, ItemStatus, Order, OrderId, OrderStatus, OrderType, ShippingInfo,
    UserId,
};
use crate::service::escrow::EscrowLedger;
use crate::traits::{ChangeSet, EventPublisher, MarketStore, TimeProvider};
use rust_decimal::Decimal;

/// Drives an order's status transitions, delegating all money movement to
/// the [`EscrowLedger`].
pub struct OrderLifecycle<S, C, E>
where
    S: MarketStore,
    C: TimeProvider,
    E: EventPublisher,
{
    store: S,
    ledger: EscrowLedger<S, C, E>,
    time: C,
    events: E,
}

impl<S, C, E> OrderLifecycle<S, C, E>
where
    S: MarketStore,
    C: TimeProvider,
    E: EventPublisher,
{
    pub fn new(store: S, ledger: EscrowLedger<S, C, E>, time: C, events: E) -> Self {
        Self {
            store,
            ledger,
            time,
            events,
        }
    }

    async fn order_or_not_found(&self, order_id: OrderId) -> MarketResult<Order> {
        self.store
            .order(order_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("order {order_id}")))
    }

    /// Direct purchase of an item at its asking price.
    pub async fn create_order(&self, item_id: ItemId, buyer: UserId) -> MarketResult<Order> {
        let mut item = self
            .store
            .item(item_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("item {item_id}")))?;

        if item.status != ItemStatus::Active {
            return Err(MarketError::StateConflict(format!(
                "item {item_id} is {:?}, not available for purchase",
                item.status
            )));
        }
        if item.seller == buyer {
            return Err(MarketError::Validation(
                "you cannot buy your own item".to_string(),
            ));
        }
        let amount = item.sale_price().ok_or_else(|| {
            MarketError::Validation(format!("item {item_id} has no price set"))
        })?;

        item.status = ItemStatus::Sold;
        let order = Order::new(
            item_id,
            buyer,
            item.seller,
            OrderType::BuyNow,
            amount,
            self.time.now(),
        );

        self.store
            .commit(ChangeSet {
                items: vec![item],
                orders: vec![order.clone()],
                ..Default::default()
            })
            .await?;

        info!(order = %order.id, item = %item_id, %amount, "order created");
        Ok(order)
    }

    /// Capture the buyer's payment for an order.
    pub async fn process_payment(
        &self,
        order_id: OrderId,
        amount: Decimal,
        payment_method: &str,
        external_ref: &str,
    ) -> MarketResult<EscrowTransaction> {
        self.ledger
            .process_payment(order_id, amount, payment_method, external_ref)
            .await
    }

    /// Record shipment and start the auto-release clock.
    pub async fn ship_order(
        &self,
        order_id: OrderId,
        tracking_number: &str,
        carrier: &str,
    ) -> MarketResult<()> {
        let mut order = self.order_or_not_found(order_id).await?;

        if order.status == OrderStatus::Disputed {
            return Err(MarketError::StateConflict(format!(
                "cannot ship disputed order {order_id}"
            )));
        }
        if order.status != OrderStatus::Paid {
            return Err(MarketError::StateConflict(format!(
                "order {order_id} is {:?}, shipping requires Paid",
                order.status
            )));
        }

        let now = self.time.now();
        let mut tx = self
            .store
            .escrow_tx_for_order(order_id)
            .await?
            .ok_or_else(|| {
                MarketError::NotFound(format!("no escrow transaction for order {order_id}"))
            })?;

        let shipping = ShippingInfo::new(
            order_id,
            tracking_number,
            carrier,
            order.shipping_address.clone(),
            now,
        );
        order.status = OrderStatus::Shipped;
        tx.escrow_release_deadline = Some(now + Duration::days(ESCROW_HOLD_DAYS));
        let deadline = tx.escrow_release_deadline;

        self.store
            .commit(ChangeSet {
                orders: vec![order],
                escrow_txs: vec![tx],
                shipping: vec![shipping],
                ..Default::default()
            })
            .await?;

        info!(order = %order_id, ?deadline, "order shipped, auto-release scheduled");

        let event = DomainEvent::new(
            EventKind::OrderShipped {
                order_id,
                tracking_number: tracking_number.to_string(),
                carrier: carrier.to_string(),
            },
            now,
        );
        if let Err(e) = self.events.publish(event).await {
            warn!(order = %order_id, "order-shipped event publish failed: {e}");
        }

        Ok(())
    }

    /// Buyer confirms receipt; escrow pays out.
    pub async fn confirm_delivery(&self, order_id: OrderId) -> MarketResult<()> {
        let mut order = self.order_or_not_found(order_id).await?;

        if order.status != OrderStatus::Shipped {
            return Err(MarketError::StateConflict(format!(
                "order {order_id} is {:?}, delivery confirmation requires Shipped",
                order.status
            )));
        }

        let now = self.time.now();
        order.status = OrderStatus::Delivered;
        self.store
            .commit(ChangeSet {
                orders: vec![order],
                ..Default::default()
            })
            .await?;

        self.ledger.release_escrow(order_id).await?;

        let event = DomainEvent::new(EventKind::OrderDelivered { order_id }, now);
        if let Err(e) = self.events.publish(event).await {
            warn!(order = %order_id, "order-delivered event publish failed: {e}");
        }

        Ok(())
    }

    /// Deadline-driven delivery confirmation.
    ///
    /// Safe to invoke redundantly: disputed and already-settled orders are
    /// skipped without error, so an overlapping sweep cannot do harm.
    pub async fn auto_confirm_delivery(&self, order_id: OrderId) -> MarketResult<()> {
        let mut order = self.order_or_not_found(order_id).await?;

        match order.status {
            OrderStatus::Disputed => {
                warn!(order = %order_id, "skipping auto-confirm for disputed order");
                return Ok(());
            }
            OrderStatus::Completed | OrderStatus::Refunded => {
                warn!(order = %order_id, "order already settled, skipping auto-confirm");
                return Ok(());
            }
            _ => {}
        }

        let now = self.time.now();
        info!(order = %order_id, "auto-confirming delivery");

        if order.status != OrderStatus::Delivered {
            order.status = OrderStatus::Delivered;
            self.store
                .commit(ChangeSet {
                    orders: vec![order],
                    ..Default::default()
                })
                .await?;
        }

        self.ledger.release_escrow(order_id).await?;

        let event = DomainEvent::new(EventKind::OrderDelivered { order_id }, now);
        if let Err(e) = self.events.publish(event).await {
            warn!(order = %order_id, "order-delivered event publish failed: {e}");
        }

        Ok(())
    }

    /// Buyer or seller reports a problem; custody freezes until resolved.
    pub async fn report_dispute(&self, order_id: OrderId, reason: &str) -> MarketResult<()> {
        self.ledger.dispute(order_id, reason).await?;
        warn!(order = %order_id, reason, "dispute reported");
        Ok(())
    }

    /// Admin override for a lost shipment: refund the buyer or force the
    /// release to the seller.
    pub async fn mark_as_lost(&self, order_id: OrderId, refund_buyer: bool) -> MarketResult<()> {
        let order = self.order_or_not_found(order_id).await?;

        if order.is_final() {
            return Err(MarketError::StateConflict(format!(
                "cannot mark order {order_id} as lost, it is already {:?}",
                order.status
            )));
        }

        info!(order = %order_id, refund_buyer, "admin marking order as lost");

        if refund_buyer {
            self.ledger.refund_buyer(order_id).await
        } else {
            self.ledger.release_escrow(order_id).await
        }
    }
}
