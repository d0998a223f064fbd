use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::marketplace::{AuctionId, BidId, ItemId, UserId};
use crate::traits::{SystemTimeProvider, TimeProvider};

/// Status of a timed auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionStatus {
    /// Created but not yet opened for bidding.
    Scheduled,
    /// Open and accepting bids.
    Active,
    /// Ended. Terminal.
    Closed,
}

/// A timed auction attached to exactly one item.
///
/// `highest_bid_id` and `bid_count` only change while the auction is
/// `Active`, and always under the auction's lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auction {
    pub id: AuctionId,

    /// The item being auctioned (1:1).
    pub item_id: ItemId,

    /// Owner of the item; may not bid on their own auction.
    pub seller: UserId,

    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    /// Minimum step a new bid must clear above the current price.
    pub min_bid_increment: Decimal,

    /// Floor for the very first bid, when set.
    pub reserve_price: Option<Decimal>,

    pub highest_bid_id: Option<BidId>,

    /// Number of bid rows recorded, including auto-generated proxy bids.
    pub bid_count: u32,

    pub status: AuctionStatus,

    /// Tentative while `Active`, final once `Closed`.
    pub winner: Option<UserId>,

    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Auction {
    /// Create a new auction builder.
    pub const fn builder() -> AuctionBuilder<SystemTimeProvider> {
        AuctionBuilder::new(SystemTimeProvider::new())
    }

    /// Create a new auction builder with a custom time provider.
    pub const fn builder_with_time<T: TimeProvider>(time: T) -> AuctionBuilder<T> {
        AuctionBuilder::new(time)
    }

    /// Check if the auction accepts bids at a specific instant.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == AuctionStatus::Active && now <= self.end_time
    }

    /// Check if the auction's time window has elapsed.
    pub fn has_ended_at(&self, now: DateTime<Utc>) -> bool {
        now > self.end_time
    }
}

/// Builder for creating new auctions.
pub struct AuctionBuilder<T: TimeProvider> {
    time: T,
    item_id: Option<ItemId>,
    seller: Option<UserId>,
    min_bid_increment: Option<Decimal>,
    reserve_price: Option<Decimal>,
    start_delay: Option<Duration>,
    duration: Option<Duration>,
}

impl<T: TimeProvider> AuctionBuilder<T> {
    /// Create a new builder with a time provider.
    pub const fn new(time: T) -> Self {
        Self {
            time,
            item_id: None,
            seller: None,
            min_bid_increment: None,
            reserve_price: None,
            start_delay: None,
            duration: None,
        }
    }

    #[must_use]
    pub fn item(mut self, item_id: ItemId) -> Self {
        self.item_id = Some(item_id);
        self
    }

    #[must_use]
    pub fn seller(mut self, seller: UserId) -> Self {
        self.seller = Some(seller);
        self
    }

    #[must_use]
    pub fn min_bid_increment(mut self, increment: Decimal) -> Self {
        self.min_bid_increment = Some(increment);
        self
    }

    #[must_use]
    pub fn reserve_price(mut self, reserve: Decimal) -> Self {
        self.reserve_price = Some(reserve);
        self
    }

    /// Delay before the auction opens, in seconds from now.
    #[must_use]
    pub fn start_delay_secs(mut self, seconds: i64) -> Self {
        self.start_delay = Some(Duration::seconds(seconds));
        self
    }

    /// Set auction duration in seconds from its start time.
    #[must_use]
    pub fn duration_secs(mut self, seconds: i64) -> Self {
        self.duration = Some(Duration::seconds(seconds));
        self
    }

    /// Build the auction (returns error if required fields are missing).
    ///
    /// Auctions start out `Scheduled`; the first bid placed after
    /// `start_time` opens them.
    pub fn build(self) -> Result<Auction, String> {
        let created_at = self.time.now();
        let start_time = created_at + self.start_delay.unwrap_or_else(Duration::zero);

        Ok(Auction {
            id: AuctionId::new(),
            item_id: self.item_id.ok_or("item is required")?,
            seller: self.seller.ok_or("seller is required")?,
            start_time,
            end_time: start_time + self.duration.ok_or("duration is required")?,
            min_bid_increment: self.min_bid_increment.ok_or("min_bid_increment is required")?,
            reserve_price: self.reserve_price,
            highest_bid_id: None,
            bid_count: 0,
            status: AuctionStatus::Scheduled,
            winner: None,
            closed_at: None,
            created_at,
        })
    }
}
