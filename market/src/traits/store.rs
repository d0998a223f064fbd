//! Storage abstraction for testable persistence of the marketplace state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::MarketResult;
use crate::marketplace::{
    Auction, AuctionId, Bid, BidId, EscrowTransaction, EscrowWallet, Item, ItemId, Order,
    OrderId, ProxyBid, ShippingInfo, UserId,
};

/// A batch of writes belonging to one operation.
///
/// Everything in a change set commits together or not at all. Wallet rows
/// are version-checked against storage; a stale wallet fails the whole
/// batch with [`crate::MarketError::Concurrency`] and the caller re-reads
/// and retries.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub auctions: Vec<Auction>,
    pub bids: Vec<Bid>,
    pub proxy_bids: Vec<ProxyBid>,
    pub items: Vec<Item>,
    pub orders: Vec<Order>,
    pub wallets: Vec<EscrowWallet>,
    pub escrow_txs: Vec<EscrowTransaction>,
    pub shipping: Vec<ShippingInfo>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.auctions.is_empty()
            && self.bids.is_empty()
            && self.proxy_bids.is_empty()
            && self.items.is_empty()
            && self.orders.is_empty()
            && self.wallets.is_empty()
            && self.escrow_txs.is_empty()
            && self.shipping.is_empty()
    }
}

/// Abstraction over marketplace persistence.
///
/// This trait enables testing of storage-dependent services without a
/// database, and keeps the ORM mechanics outside the core.
#[async_trait]
pub trait MarketStore: Send + Sync + Clone {
    async fn auction(&self, id: AuctionId) -> MarketResult<Option<Auction>>;

    /// The auction attached to an item (1:1).
    async fn auction_by_item(&self, item_id: ItemId) -> MarketResult<Option<Auction>>;

    /// Active auctions whose end time has passed.
    async fn expired_active_auctions(&self, now: DateTime<Utc>) -> MarketResult<Vec<Auction>>;

    async fn bid(&self, id: BidId) -> MarketResult<Option<Bid>>;

    /// All bids on an auction, highest amount first.
    async fn bids_by_auction(&self, auction_id: AuctionId) -> MarketResult<Vec<Bid>>;

    /// All bids a user has placed, newest first.
    async fn bids_by_bidder(&self, bidder: UserId) -> MarketResult<Vec<Bid>>;

    /// Active proxy ceilings for an auction, every bidder's included.
    async fn active_proxy_bids(&self, auction_id: AuctionId) -> MarketResult<Vec<ProxyBid>>;

    async fn item(&self, id: ItemId) -> MarketResult<Option<Item>>;

    async fn order(&self, id: OrderId) -> MarketResult<Option<Order>>;

    async fn orders_by_buyer(&self, buyer: UserId) -> MarketResult<Vec<Order>>;

    async fn orders_by_seller(&self, seller: UserId) -> MarketResult<Vec<Order>>;

    /// Orders still awaiting payment that were created before `cutoff`.
    async fn unpaid_orders_before(&self, cutoff: DateTime<Utc>) -> MarketResult<Vec<Order>>;

    async fn wallet_for_user(&self, user: UserId) -> MarketResult<Option<EscrowWallet>>;

    /// The singleton platform custody wallet, if it has been created.
    async fn platform_wallet(&self) -> MarketResult<Option<EscrowWallet>>;

    /// The escrow transaction owned by an order (at most one).
    async fn escrow_tx_for_order(&self, order_id: OrderId)
        -> MarketResult<Option<EscrowTransaction>>;

    /// Held transactions whose release deadline has passed.
    async fn held_txs_past_deadline(
        &self,
        now: DateTime<Utc>,
    ) -> MarketResult<Vec<EscrowTransaction>>;

    /// Atomically apply a change set.
    async fn commit(&self, changes: ChangeSet) -> MarketResult<()>;
}
