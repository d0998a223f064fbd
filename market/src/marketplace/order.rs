use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::PAYMENT_WINDOW_HOURS;
use crate::marketplace::{ItemId, OrderId, ShippingInfoId, UserId};

/// Status of a purchase order.
///
/// Legal transitions:
/// `PendingPayment → Paid → Shipped → Delivered → Completed`,
/// `PendingPayment → Cancelled`,
/// `Paid | Shipped | Delivered → Disputed`,
/// `Disputed → Completed | Refunded`, and
/// `Paid → Refunded` (admin override).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    PendingPayment,
    Paid,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Disputed,
    Refunded,
}

/// How the order came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Spawned by closing an auction with a winning bid.
    AuctionWin,
    /// Direct purchase at the asking price.
    BuyNow,
}

/// A purchase order binding buyer, seller, and item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub item_id: ItemId,
    pub buyer: UserId,
    pub seller: UserId,
    pub order_type: OrderType,
    pub amount: Decimal,
    pub shipping_address: Option<String>,
    pub status: OrderStatus,

    /// Unpaid orders are cancelled after this instant.
    pub payment_deadline: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a pending order awaiting payment.
    pub fn new(
        item_id: ItemId,
        buyer: UserId,
        seller: UserId,
        order_type: OrderType,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            item_id,
            buyer,
            seller,
            order_type,
            amount,
            shipping_address: None,
            status: OrderStatus::PendingPayment,
            payment_deadline: created_at + Duration::hours(PAYMENT_WINDOW_HOURS),
            created_at,
        }
    }

    /// Whether the order has reached a state no operation may leave.
    pub fn is_final(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }
}

/// Shipment details recorded when the seller hands the item to a carrier.
/// At most one per order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub id: ShippingInfoId,
    pub order_id: OrderId,
    pub tracking_number: String,
    pub carrier: String,
    pub shipping_address: Option<String>,
    pub shipped_at: DateTime<Utc>,
}

impl ShippingInfo {
    pub fn new(
        order_id: OrderId,
        tracking_number: impl Into<String>,
        carrier: impl Into<String>,
        shipping_address: Option<String>,
        shipped_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ShippingInfoId::new(),
            order_id,
            tracking_number: tracking_number.into(),
            carrier: carrier.into(),
            shipping_address,
            shipped_at,
        }
    }
}
