//! End-to-end marketplace simulation against the in-memory backends.
//!
//! Drives one auction from first bid to escrow payout: competing proxy
//! bids, scheduler-driven close, payment capture, shipment, and delivery
//! confirmation. Logging goes to stderr; set `RUST_LOG` to adjust verbosity.
//!
//! Usage:
//!   market-sim

use std::time::Duration;

use marketplace::{
    Auction, AuctionCloser, AuctionLifecycle, AuctionStatus, BiddingEngine, BidSubmission,
    DistributedLock, EscrowLedger, Item, LoggingBroadcaster, LoggingEventPublisher,
    MarketStore, MemoryLockStore, MemoryStore, OrderLifecycle, SystemTimeProvider, UserId,
};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .init();
}

/// Poll the store until the auction closes or the budget runs out.
async fn wait_for_close(store: &MemoryStore, auction: &Auction) -> anyhow::Result<()> {
    for _ in 0..50 {
        if let Some(stored) = store.auction(auction.id).await? {
            if stored.status == AuctionStatus::Closed {
                return Ok(());
            }
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    anyhow::bail!("auction did not close within the wait budget")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    info!("market-sim starting");

    let store = MemoryStore::new();
    let locks = MemoryLockStore::new();
    let time = SystemTimeProvider::new();
    let broadcaster = LoggingBroadcaster::new();
    let events = LoggingEventPublisher::new();

    let engine = BiddingEngine::new(
        store.clone(),
        DistributedLock::new(locks.clone()),
        time,
        broadcaster,
        events,
    );
    let lifecycle = AuctionLifecycle::new(store.clone(), time, broadcaster, events);
    let ledger = EscrowLedger::new(store.clone(), time, events);
    let orders = OrderLifecycle::new(store.clone(), ledger, time, events);
    let closer = AuctionCloser::new(
        store.clone(),
        DistributedLock::new(locks.clone()),
        lifecycle,
        time,
    );

    let shutdown = CancellationToken::new();
    let closer_handle = tokio::spawn(closer.run(shutdown.clone()));

    // Seller lists an item with a three-second auction.
    let seller = UserId::new();
    let item = Item::new(seller, "1932 press camera");
    let auction = Auction::builder()
        .item(item.id)
        .seller(seller)
        .min_bid_increment(Decimal::new(10, 0))
        .reserve_price(Decimal::new(100, 0))
        .duration_secs(3)
        .build()
        .map_err(|e| anyhow::anyhow!(e))?;
    store
        .commit(marketplace::ChangeSet {
            items: vec![item.clone()],
            auctions: vec![auction.clone()],
            ..Default::default()
        })
        .await?;
    info!(auction = %auction.id, "auction listed");

    // Alice opens at the reserve; Bob counters holding a 150 ceiling;
    // Alice pushes to 120 and Bob's proxy answers.
    let alice = UserId::new();
    let bob = UserId::new();

    engine
        .place_bid(
            item.id,
            BidSubmission {
                bidder: alice,
                amount: Decimal::new(100, 0),
                max_proxy: None,
            },
        )
        .await?;
    engine
        .place_bid(
            item.id,
            BidSubmission {
                bidder: bob,
                amount: Decimal::new(110, 0),
                max_proxy: Some(Decimal::new(150, 0)),
            },
        )
        .await?;
    let highest = engine
        .place_bid(
            item.id,
            BidSubmission {
                bidder: alice,
                amount: Decimal::new(120, 0),
                max_proxy: None,
            },
        )
        .await?;
    info!(amount = %highest.amount, auto = highest.is_auto_bid, "highest bid after the battle");

    // The closer sweep picks the auction up once its window lapses.
    wait_for_close(&store, &auction).await?;

    let order = store
        .orders_by_buyer(bob)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no order for the auction winner"))?;
    info!(order = %order.id, amount = %order.amount, "winner's order created");

    // Payment, shipment, and delivery settle the escrow.
    orders
        .process_payment(order.id, order.amount, "CARD", "sim-capture-1")
        .await?;
    orders.ship_order(order.id, "TRACK-0001", "UPS").await?;
    orders.confirm_delivery(order.id).await?;

    for wallet in store.all_wallets().await {
        let owner = wallet
            .owner
            .map_or_else(|| "platform".to_string(), |u| u.to_string());
        info!(%owner, balance = %wallet.balance, "final balance");
    }

    shutdown.cancel();
    let _ = closer_handle.await;
    info!("market-sim finished");
    Ok(())
}
