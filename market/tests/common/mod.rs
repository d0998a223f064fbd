//! Shared harness for integration tests.
//!
//! Wires every service against the in-memory backends and a mock clock,
//! so whole flows (bid, close, pay, ship, release) run deterministically.

// Not every test binary exercises every helper.
#![allow(dead_code)]

use marketplace::mocks::{MockBroadcaster, MockEventPublisher, MockTime};
use marketplace::{
    Auction, AuctionCloser, AuctionLifecycle, BidSubmission, BiddingEngine, ChangeSet,
    DistributedLock, EscrowAutoReleaser, EscrowLedger, Item, MarketStore, MemoryLockStore,
    MemoryStore, OrderLifecycle, PaymentExpirer, UserId,
};
use rust_decimal::Decimal;

pub type Engine =
    BiddingEngine<MemoryStore, MemoryLockStore, MockTime, MockBroadcaster, MockEventPublisher>;
pub type Lifecycle =
    AuctionLifecycle<MemoryStore, MockTime, MockBroadcaster, MockEventPublisher>;
pub type Ledger = EscrowLedger<MemoryStore, MockTime, MockEventPublisher>;
pub type Orders = OrderLifecycle<MemoryStore, MockTime, MockEventPublisher>;
pub type Closer =
    AuctionCloser<MemoryStore, MemoryLockStore, MockTime, MockBroadcaster, MockEventPublisher>;
pub type Releaser = EscrowAutoReleaser<MemoryStore, MockTime, MockEventPublisher>;

/// One marketplace world shared by every component under test.
pub struct TestWorld {
    pub store: MemoryStore,
    pub locks: MemoryLockStore,
    pub time: MockTime,
    pub broadcaster: MockBroadcaster,
    pub events: MockEventPublisher,
}

impl TestWorld {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            locks: MemoryLockStore::new(),
            time: MockTime::default_time(),
            broadcaster: MockBroadcaster::new(),
            events: MockEventPublisher::new(),
        }
    }

    pub fn bidding(&self) -> Engine {
        BiddingEngine::new(
            self.store.clone(),
            DistributedLock::new(self.locks.clone()),
            self.time.clone(),
            self.broadcaster.clone(),
            self.events.clone(),
        )
    }

    pub fn auctions(&self) -> Lifecycle {
        AuctionLifecycle::new(
            self.store.clone(),
            self.time.clone(),
            self.broadcaster.clone(),
            self.events.clone(),
        )
    }

    pub fn ledger(&self) -> Ledger {
        EscrowLedger::new(self.store.clone(), self.time.clone(), self.events.clone())
    }

    pub fn orders(&self) -> Orders {
        OrderLifecycle::new(
            self.store.clone(),
            self.ledger(),
            self.time.clone(),
            self.events.clone(),
        )
    }

    pub fn closer(&self) -> Closer {
        AuctionCloser::new(
            self.store.clone(),
            DistributedLock::new(self.locks.clone()),
            self.auctions(),
            self.time.clone(),
        )
    }

    pub fn releaser(&self) -> Releaser {
        EscrowAutoReleaser::new(self.store.clone(), self.orders(), self.time.clone())
    }

    pub fn expirer(&self) -> PaymentExpirer<MemoryStore, MockTime> {
        PaymentExpirer::new(self.store.clone(), self.time.clone())
    }

    /// List an item with an auction opening now.
    pub async fn list_auction(
        &self,
        seller: UserId,
        reserve: Decimal,
        increment: Decimal,
        duration_secs: i64,
    ) -> (Item, Auction) {
        let item = Item::new(seller, "Test lot");
        let auction = Auction::builder_with_time(self.time.clone())
            .item(item.id)
            .seller(seller)
            .min_bid_increment(increment)
            .reserve_price(reserve)
            .duration_secs(duration_secs)
            .build()
            .unwrap();

        self.store
            .commit(ChangeSet {
                items: vec![item.clone()],
                auctions: vec![auction.clone()],
                ..Default::default()
            })
            .await
            .unwrap();
        (item, auction)
    }

    /// Sum of every wallet balance in the world.
    pub async fn total_balance(&self) -> Decimal {
        self.store
            .all_wallets()
            .await
            .iter()
            .map(|w| w.balance)
            .sum()
    }

    pub async fn balance_of(&self, user: UserId) -> Decimal {
        self.store
            .wallet_for_user(user)
            .await
            .unwrap()
            .map(|w| w.balance)
            .unwrap_or_default()
    }

    pub async fn platform_balance(&self) -> Decimal {
        self.store
            .platform_wallet()
            .await
            .unwrap()
            .map(|w| w.balance)
            .unwrap_or_default()
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

pub fn bid(bidder: UserId, amount: Decimal, max_proxy: Option<Decimal>) -> BidSubmission {
    BidSubmission {
        bidder,
        amount,
        max_proxy,
    }
}
