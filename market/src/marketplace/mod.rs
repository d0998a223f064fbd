//! Domain model for auctions, bids, items, orders, and escrow bookkeeping.

pub mod auction;
pub mod bid;
pub mod ids;
pub mod item;
pub mod order;
pub mod wallet;

pub use auction::{Auction, AuctionBuilder, AuctionStatus};
pub use bid::{Bid, BidStatus, ProxyBid};
pub use ids::{
    AuctionId, BidId, EscrowTxId, ItemId, OrderId, ShippingInfoId, UserId, WalletId,
};
pub use item::{Item, ItemStatus};
pub use order::{Order, OrderStatus, OrderType, ShippingInfo};
pub use wallet::{EscrowStatus, EscrowTransaction, EscrowWallet};
