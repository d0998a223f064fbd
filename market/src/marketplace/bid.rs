use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::marketplace::{AuctionId, BidId, UserId};

/// Lifecycle of a single bid row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BidStatus {
    /// Recorded, not currently leading.
    Active,
    /// Beaten by a later bid.
    Outbid,
    /// Currently the highest bid of an open auction.
    Winning,
    /// Highest bid of a closed auction. Terminal.
    Won,
    /// Any other bid of a closed auction. Terminal.
    Lost,
    Cancelled,
}

impl BidStatus {
    /// Whether this status can still change.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Won | Self::Lost | Self::Cancelled)
    }
}

/// One recorded bid. The amount never changes after creation; only the
/// status advances as the auction progresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub auction_id: AuctionId,
    pub bidder: UserId,
    pub amount: Decimal,

    /// Placed on behalf of a proxy ceiling rather than typed in directly.
    pub is_proxy_bid: bool,

    /// Generated by the system to defend a proxy ceiling.
    pub is_auto_bid: bool,

    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
}

impl Bid {
    /// Record a new bid. Starts out `Active`; the caller promotes the
    /// winning row to `Winning`.
    pub fn new(
        auction_id: AuctionId,
        bidder: UserId,
        amount: Decimal,
        is_auto_bid: bool,
        is_proxy_bid: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BidId::new(),
            auction_id,
            bidder,
            amount,
            is_proxy_bid,
            is_auto_bid,
            status: BidStatus::Active,
            created_at,
        }
    }
}

/// A bidder-authorized ceiling for one auction.
///
/// The system bids on the bidder's behalf up to `max_amount` as needed to
/// stay ahead. At most one exists per (auction, bidder), and the ceiling
/// never decreases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyBid {
    pub auction_id: AuctionId,
    pub bidder: UserId,

    /// The most this bidder has authorized.
    pub max_amount: Decimal,

    /// The price their proxy last bid at (zero until it fires).
    pub current_amount: Decimal,

    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl ProxyBid {
    pub fn new(
        auction_id: AuctionId,
        bidder: UserId,
        max_amount: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            auction_id,
            bidder,
            max_amount,
            current_amount: Decimal::ZERO,
            is_active: true,
            updated_at: now,
        }
    }

    /// Raise the ceiling to `max_amount` if higher; a ceiling is never
    /// lowered. Reactivates the proxy either way.
    pub fn raise_ceiling(&mut self, max_amount: Decimal, now: DateTime<Utc>) {
        if max_amount > self.max_amount {
            self.max_amount = max_amount;
        }
        self.is_active = true;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockTime;
    use crate::traits::TimeProvider;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_bid_starts_active() {
        let now = MockTime::at_unix(1_000).now();
        let bid = Bid::new(AuctionId::new(), UserId::new(), dec!(120), false, false, now);

        assert_eq!(bid.status, BidStatus::Active);
        assert_eq!(bid.amount, dec!(120));
        assert!(!bid.is_auto_bid);
    }

    #[test]
    fn test_bid_status_settled() {
        assert!(BidStatus::Won.is_settled());
        assert!(BidStatus::Lost.is_settled());
        assert!(BidStatus::Cancelled.is_settled());
        assert!(!BidStatus::Winning.is_settled());
        assert!(!BidStatus::Outbid.is_settled());
    }

    #[test]
    fn test_proxy_ceiling_raises() {
        let time = MockTime::at_unix(1_000);
        let mut proxy = ProxyBid::new(AuctionId::new(), UserId::new(), dec!(150), time.now());

        proxy.raise_ceiling(dec!(200), time.now());
        assert_eq!(proxy.max_amount, dec!(200));
    }

    #[test]
    fn test_proxy_ceiling_never_lowered() {
        let time = MockTime::at_unix(1_000);
        let mut proxy = ProxyBid::new(AuctionId::new(), UserId::new(), dec!(150), time.now());

        proxy.is_active = false;
        proxy.raise_ceiling(dec!(100), time.now());

        assert_eq!(proxy.max_amount, dec!(150));
        // A losing raise still reactivates the proxy.
        assert!(proxy.is_active);
    }
}
