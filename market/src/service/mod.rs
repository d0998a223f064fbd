//! Service layer: the orchestration around the domain model.

pub mod auctions;
pub mod bidding;
pub mod escrow;
pub mod lock;
pub mod orders;
pub mod resolver;

pub use auctions::AuctionLifecycle;
pub use bidding::BiddingEngine;
pub use escrow::EscrowLedger;
pub use lock::DistributedLock;
pub use orders::OrderLifecycle;
pub use resolver::{BidSubmission, Resolution};
