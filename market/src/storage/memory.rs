//! In-memory storage backends.
//!
//! Process-local reference implementations of the storage seams: a
//! [`MarketStore`] holding the whole world under one `RwLock`, and a
//! [`LockStore`] over an expiring map. They keep the commit semantics a
//! database-backed store would have: a change set applies atomically and
//! wallet writes are version-checked.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::error::{MarketError, MarketResult};
use crate::marketplace::{
    Auction, AuctionId, AuctionStatus, Bid, BidId, EscrowStatus, EscrowTransaction, EscrowTxId,
    EscrowWallet, Item, ItemId, Order, OrderId, OrderStatus, ProxyBid, ShippingInfo, UserId,
    WalletId,
};
use crate::traits::{ChangeSet, LockStore, MarketStore};

#[derive(Debug, Default)]
struct MemoryInner {
    auctions: HashMap<AuctionId, Auction>,
    bids: HashMap<BidId, Bid>,
    proxy_bids: HashMap<(AuctionId, UserId), ProxyBid>,
    items: HashMap<ItemId, Item>,
    orders: HashMap<OrderId, Order>,
    wallets: HashMap<WalletId, EscrowWallet>,
    escrow_txs: HashMap<EscrowTxId, EscrowTransaction>,
    shipping: HashMap<OrderId, ShippingInfo>,
}

/// In-memory [`MarketStore`].
///
/// All state sits behind a single `RwLock`, so a committed change set is
/// observed in full or not at all by every reader.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shipment record for an order, if one was written (for assertions).
    pub async fn shipping_for_order(&self, order_id: OrderId) -> Option<ShippingInfo> {
        self.inner.read().await.shipping.get(&order_id).cloned()
    }

    /// Every wallet in the store (for assertions such as balance
    /// conservation checks).
    pub async fn all_wallets(&self) -> Vec<EscrowWallet> {
        self.inner.read().await.wallets.values().cloned().collect()
    }

    /// Proxy ceiling for one (auction, bidder) pair.
    pub async fn proxy_bid(&self, auction_id: AuctionId, bidder: UserId) -> Option<ProxyBid> {
        self.inner
            .read()
            .await
            .proxy_bids
            .get(&(auction_id, bidder))
            .cloned()
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn auction(&self, id: AuctionId) -> MarketResult<Option<Auction>> {
        Ok(self.inner.read().await.auctions.get(&id).cloned())
    }

    async fn auction_by_item(&self, item_id: ItemId) -> MarketResult<Option<Auction>> {
        let inner = self.inner.read().await;
        Ok(inner
            .auctions
            .values()
            .find(|a| a.item_id == item_id)
            .cloned())
    }

    async fn expired_active_auctions(&self, now: DateTime<Utc>) -> MarketResult<Vec<Auction>> {
        let inner = self.inner.read().await;
        Ok(inner
            .auctions
            .values()
            .filter(|a| a.status == AuctionStatus::Active && a.end_time < now)
            .cloned()
            .collect())
    }

    async fn bid(&self, id: BidId) -> MarketResult<Option<Bid>> {
        Ok(self.inner.read().await.bids.get(&id).cloned())
    }

    async fn bids_by_auction(&self, auction_id: AuctionId) -> MarketResult<Vec<Bid>> {
        let inner = self.inner.read().await;
        let mut bids: Vec<Bid> = inner
            .bids
            .values()
            .filter(|b| b.auction_id == auction_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| b.amount.cmp(&a.amount).then(b.created_at.cmp(&a.created_at)));
        Ok(bids)
    }

    async fn bids_by_bidder(&self, bidder: UserId) -> MarketResult<Vec<Bid>> {
        let inner = self.inner.read().await;
        let mut bids: Vec<Bid> = inner
            .bids
            .values()
            .filter(|b| b.bidder == bidder)
            .cloned()
            .collect();
        bids.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bids)
    }

    async fn active_proxy_bids(&self, auction_id: AuctionId) -> MarketResult<Vec<ProxyBid>> {
        let inner = self.inner.read().await;
        Ok(inner
            .proxy_bids
            .values()
            .filter(|p| p.auction_id == auction_id && p.is_active)
            .cloned()
            .collect())
    }

    async fn item(&self, id: ItemId) -> MarketResult<Option<Item>> {
        Ok(self.inner.read().await.items.get(&id).cloned())
    }

    async fn order(&self, id: OrderId) -> MarketResult<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn orders_by_buyer(&self, buyer: UserId) -> MarketResult<Vec<Order>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.buyer == buyer)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn orders_by_seller(&self, seller: UserId) -> MarketResult<Vec<Order>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.seller == seller)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn unpaid_orders_before(&self, cutoff: DateTime<Utc>) -> MarketResult<Vec<Order>> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::PendingPayment && o.created_at < cutoff)
            .cloned()
            .collect())
    }

    async fn wallet_for_user(&self, user: UserId) -> MarketResult<Option<EscrowWallet>> {
        let inner = self.inner.read().await;
        Ok(inner
            .wallets
            .values()
            .find(|w| w.owner == Some(user))
            .cloned())
    }

    async fn platform_wallet(&self) -> MarketResult<Option<EscrowWallet>> {
        let inner = self.inner.read().await;
        Ok(inner.wallets.values().find(|w| w.owner.is_none()).cloned())
    }

    async fn escrow_tx_for_order(
        &self,
        order_id: OrderId,
    ) -> MarketResult<Option<EscrowTransaction>> {
        let inner = self.inner.read().await;
        Ok(inner
            .escrow_txs
            .values()
            .find(|t| t.order_id == order_id)
            .cloned())
    }

    async fn held_txs_past_deadline(
        &self,
        now: DateTime<Utc>,
    ) -> MarketResult<Vec<EscrowTransaction>> {
        let inner = self.inner.read().await;
        Ok(inner
            .escrow_txs
            .values()
            .filter(|t| {
                t.status == EscrowStatus::Held
                    && t.escrow_release_deadline.is_some_and(|d| d < now)
            })
            .cloned()
            .collect())
    }

    async fn commit(&self, changes: ChangeSet) -> MarketResult<()> {
        let mut inner = self.inner.write().await;

        // Validate every wallet write before applying anything, so a
        // conflict leaves the store untouched.
        for wallet in &changes.wallets {
            match inner.wallets.get(&wallet.id) {
                Some(existing) if existing.version != wallet.version => {
                    return Err(MarketError::Concurrency(format!(
                        "wallet {} version conflict: stored {}, submitted {}",
                        wallet.id, existing.version, wallet.version
                    )));
                }
                Some(_) => {}
                None => {
                    // A racing creator may have inserted a wallet for the
                    // same owner under a different id.
                    let duplicate = inner
                        .wallets
                        .values()
                        .any(|w| w.owner == wallet.owner && w.id != wallet.id);
                    if duplicate {
                        return Err(MarketError::Concurrency(format!(
                            "wallet for {:?} already exists",
                            wallet.owner
                        )));
                    }
                }
            }
        }

        for mut wallet in changes.wallets {
            wallet.version += 1;
            inner.wallets.insert(wallet.id, wallet);
        }
        for auction in changes.auctions {
            inner.auctions.insert(auction.id, auction);
        }
        for bid in changes.bids {
            inner.bids.insert(bid.id, bid);
        }
        for proxy in changes.proxy_bids {
            inner
                .proxy_bids
                .insert((proxy.auction_id, proxy.bidder), proxy);
        }
        for item in changes.items {
            inner.items.insert(item.id, item);
        }
        for order in changes.orders {
            inner.orders.insert(order.id, order);
        }
        for tx in changes.escrow_txs {
            inner.escrow_txs.insert(tx.id, tx);
        }
        for info in changes.shipping {
            inner.shipping.insert(info.order_id, info);
        }

        Ok(())
    }
}

/// In-memory [`LockStore`] with expiring entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryLockStore {
    entries: Arc<Mutex<HashMap<String, Instant>>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live entry currently exists for `key`.
    pub async fn is_held(&self, key: &str) -> bool {
        let entries = self.entries.lock().await;
        entries.get(key).is_some_and(|expiry| *expiry > Instant::now())
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn put_if_absent(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get(key) {
            Some(expiry) if *expiry > now => Ok(false),
            _ => {
                entries.insert(key.to_string(), now + ttl);
                Ok(true)
            }
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
