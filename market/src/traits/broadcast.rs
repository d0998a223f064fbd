//! Real-time fan-out abstraction for auction subscribers.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::marketplace::{AuctionId, Bid, UserId};

/// A message pushed to everyone watching one auction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AuctionNotice {
    /// A new highest bid.
    BidUpdate { bid: Bid },
    /// The auction closed; `winning_bid` is `None` when nobody bid.
    Ended { winning_bid: Option<Bid> },
}

/// Abstraction over the push delivery channel (WebSocket or similar).
///
/// Delivery is best-effort; callers log failures and move on.
#[async_trait]
pub trait AuctionBroadcaster: Send + Sync + Clone {
    /// Push a notice to subscribers of one auction.
    async fn broadcast(&self, auction_id: AuctionId, notice: &AuctionNotice) -> Result<()>;

    /// Push a notice to one user.
    async fn notify_user(&self, user: UserId, message: &str) -> Result<()>;
}

/// Default broadcaster that writes notices to the log. Useful wherever no
/// push channel is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingBroadcaster;

impl LoggingBroadcaster {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuctionBroadcaster for LoggingBroadcaster {
    async fn broadcast(&self, auction_id: AuctionId, notice: &AuctionNotice) -> Result<()> {
        match notice {
            AuctionNotice::BidUpdate { bid } => {
                info!(auction = %auction_id, amount = %bid.amount, bidder = %bid.bidder, "bid update");
            }
            AuctionNotice::Ended { winning_bid: Some(bid) } => {
                info!(auction = %auction_id, amount = %bid.amount, winner = %bid.bidder, "auction ended");
            }
            AuctionNotice::Ended { winning_bid: None } => {
                info!(auction = %auction_id, "auction ended with no bids");
            }
        }
        Ok(())
    }

    async fn notify_user(&self, user: UserId, message: &str) -> Result<()> {
        info!(%user, message, "user notice");
        Ok(())
    }
}
