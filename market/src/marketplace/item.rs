use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::marketplace::{ItemId, UserId};

/// Sale status of a listed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    Draft,
    PendingApproval,
    /// Listed and purchasable / biddable.
    Active,
    Sold,
    Cancelled,
    Rejected,
}

/// An item offered for sale, by auction or at a fixed price.
///
/// While its auction runs, `current_price` mirrors the highest bid and is
/// monotonically non-decreasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub seller: UserId,
    pub title: String,
    pub starting_bid: Option<Decimal>,
    pub fixed_price: Option<Decimal>,
    pub current_price: Option<Decimal>,
    pub buy_now_price: Option<Decimal>,
    pub status: ItemStatus,
}

impl Item {
    /// Create an active listing.
    pub fn new(seller: UserId, title: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            seller,
            title: title.into(),
            starting_bid: None,
            fixed_price: None,
            current_price: None,
            buy_now_price: None,
            status: ItemStatus::Active,
        }
    }

    /// The price a direct purchase settles at: the live auction price if
    /// bidding has moved it, otherwise the fixed asking price.
    pub fn sale_price(&self) -> Option<Decimal> {
        self.current_price.or(self.fixed_price)
    }
}
