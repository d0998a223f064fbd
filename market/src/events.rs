//! Domain events emitted after state transitions commit.
//!
//! Events are handed to the publishing collaborator only once the owning
//! write has committed; a publish failure is logged by the caller and never
//! fails the operation that produced it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::marketplace::{AuctionId, BidId, ItemId, OrderId, UserId};

/// Envelope common to every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl DomainEvent {
    pub fn new(kind: EventKind, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at,
            kind,
        }
    }
}

/// The closed set of state transitions the core announces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    BidPlaced {
        auction_id: AuctionId,
        bid_id: BidId,
        bidder: UserId,
        amount: Decimal,
    },
    AuctionWon {
        auction_id: AuctionId,
        item_id: ItemId,
        winner: UserId,
        amount: Decimal,
    },
    OrderPaid {
        order_id: OrderId,
        buyer: UserId,
        amount: Decimal,
    },
    OrderShipped {
        order_id: OrderId,
        tracking_number: String,
        carrier: String,
    },
    OrderDelivered {
        order_id: OrderId,
    },
    EscrowReleased {
        order_id: OrderId,
        seller: UserId,
        amount: Decimal,
    },
    DisputeOpened {
        order_id: OrderId,
        reason: String,
    },
}
