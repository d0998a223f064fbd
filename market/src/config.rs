//! Configuration constants for the marketplace core.
//!
//! This module centralizes magic numbers and tunables to improve
//! maintainability and enable easier tuning.

use rust_decimal::Decimal;

use crate::marketplace::AuctionId;

/// Expiration applied to a distributed lock entry, in milliseconds.
/// A crashed holder's lease lapses after this long.
pub const LOCK_LEASE_MS: u64 = 5_000;

/// Maximum time a bid request waits for the per-auction lock before
/// reporting the system as busy.
pub const LOCK_WAIT_MS: u64 = 3_000;

/// Pause between lock acquisition attempts while waiting.
pub const LOCK_RETRY_INTERVAL_MS: u64 = 50;

/// Interval between sweeps for expired auctions.
pub const AUCTION_CLOSE_INTERVAL_SECS: u64 = 1;

/// Interval between sweeps for escrow transactions past their release deadline.
pub const ESCROW_RELEASE_INTERVAL_SECS: u64 = 3_600;

/// Interval between sweeps for stale unpaid orders.
pub const PAYMENT_EXPIRY_INTERVAL_SECS: u64 = 60;

/// Hours a buyer has to pay before an order is cancelled.
pub const PAYMENT_WINDOW_HOURS: i64 = 24;

/// Days after shipment before held escrow funds release automatically.
pub const ESCROW_HOLD_DAYS: i64 = 7;

/// Maximum retries for a ledger operation whose wallet write hit a
/// version conflict.
pub const WALLET_COMMIT_MAX_RETRIES: u32 = 10;

/// Fraction of the escrowed amount retained by the platform on release (5%).
pub fn platform_fee_rate() -> Decimal {
    Decimal::new(5, 2)
}

/// Lock key guarding one auction's aggregate.
///
/// Bid placement and auction closing share this key, so the two operations
/// are mutually exclusive for the same auction.
pub fn auction_lock_key(auction_id: AuctionId) -> String {
    format!("auction:{auction_id}")
}
