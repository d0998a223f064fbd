pub mod config;
pub mod error;
pub mod events;
pub mod marketplace;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use error::{MarketError, MarketResult};
pub use events::{DomainEvent, EventKind};
pub use marketplace::{
    Auction, AuctionId, AuctionStatus, Bid, BidId, BidStatus, EscrowStatus, EscrowTransaction,
    EscrowTxId, EscrowWallet, Item, ItemId, ItemStatus, Order, OrderId, OrderStatus, OrderType,
    ProxyBid, ShippingInfo, UserId, WalletId,
};
pub use scheduler::{AuctionCloser, EscrowAutoReleaser, PaymentExpirer};
pub use service::auctions::AuctionLifecycle;
pub use service::bidding::BiddingEngine;
pub use service::escrow::EscrowLedger;
pub use service::lock::DistributedLock;
pub use service::orders::OrderLifecycle;
pub use service::resolver::{BidSubmission, Resolution};
pub use storage::{MemoryLockStore, MemoryStore};
pub use traits::{
    AuctionBroadcaster, AuctionNotice, ChangeSet, EventPublisher, LockStore, LoggingBroadcaster,
    LoggingEventPublisher, MarketStore, SystemTimeProvider, TimeProvider,
};
