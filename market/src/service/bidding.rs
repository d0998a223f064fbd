//! Bid orchestration: locking, validation, resolution, persistence, fan-out.

use std::time::Duration;
use tracing::{info, warn};

use crate::config::{auction_lock_key, LOCK_LEASE_MS, LOCK_WAIT_MS};
use crate::error::{MarketError, MarketResult};
use crate::events::{DomainEvent, EventKind};
use crate::marketplace::{AuctionId, AuctionStatus, Bid, BidStatus, ItemId};
use crate::service::lock::DistributedLock;
use crate::service::resolver::{self, BidSubmission};
use crate::traits::{
    AuctionBroadcaster, AuctionNotice, ChangeSet, EventPublisher, LockStore, MarketStore,
    TimeProvider,
};

/// Serializes and applies bid submissions for one service instance.
///
/// Within one auction, resolutions are strictly ordered by the per-auction
/// lock; each one sees the state the previous one committed. Across
/// auctions there is no ordering.
pub struct BiddingEngine<S, L, C, B, E>
where
    S: MarketStore,
    L: LockStore,
    C: TimeProvider,
    B: AuctionBroadcaster,
    E: EventPublisher,
{
    store: S,
    lock: DistributedLock<L>,
    time: C,
    broadcaster: B,
    events: E,
}

impl<S, L, C, B, E> BiddingEngine<S, L, C, B, E>
where
    S: MarketStore,
    L: LockStore,
    C: TimeProvider,
    B: AuctionBroadcaster,
    E: EventPublisher,
{
    pub fn new(store: S, lock: DistributedLock<L>, time: C, broadcaster: B, events: E) -> Self {
        Self {
            store,
            lock,
            time,
            broadcaster,
            events,
        }
    }

    /// Place a bid on the item's auction.
    ///
    /// Returns the resulting highest bid, which belongs to a competing
    /// bidder when their proxy ceiling out-bid the submission. Fails with
    /// [`MarketError::Concurrency`] when the auction's lock cannot be
    /// obtained within the wait budget; that failure is transient and the
    /// caller may retry.
    pub async fn place_bid(
        &self,
        item_id: ItemId,
        submission: BidSubmission,
    ) -> MarketResult<Bid> {
        let auction = self
            .store
            .auction_by_item(item_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("no auction for item {item_id}")))?;

        let key = auction_lock_key(auction.id);
        let acquired = self
            .lock
            .acquire_with_retry(
                &key,
                Duration::from_millis(LOCK_WAIT_MS),
                Duration::from_millis(LOCK_LEASE_MS),
            )
            .await?;
        if !acquired {
            return Err(MarketError::Concurrency(
                "auction is busy, please try again".to_string(),
            ));
        }

        let result = self.process_bid(auction.id, submission).await;
        // The lock is released whether resolution succeeded or not.
        self.lock.release(&key).await;
        result
    }

    async fn process_bid(
        &self,
        auction_id: AuctionId,
        submission: BidSubmission,
    ) -> MarketResult<Bid> {
        let now = self.time.now();

        // Re-read under the lock so resolution sees the latest committed
        // state, not what the caller loaded before waiting.
        let mut auction = self
            .store
            .auction(auction_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("auction {auction_id}")))?;

        match auction.status {
            AuctionStatus::Active => {}
            // The first bid after the start time opens the auction.
            AuctionStatus::Scheduled if now >= auction.start_time => {
                auction.status = AuctionStatus::Active;
            }
            _ => {
                return Err(MarketError::StateConflict(format!(
                    "auction {auction_id} is not open for bidding"
                )));
            }
        }
        if auction.has_ended_at(now) {
            return Err(MarketError::StateConflict(format!(
                "auction {auction_id} has ended"
            )));
        }
        if auction.seller == submission.bidder {
            return Err(MarketError::Validation(
                "you cannot bid on your own item".to_string(),
            ));
        }

        let mut item = self
            .store
            .item(auction.item_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("item {}", auction.item_id)))?;

        let proxies = self.store.active_proxy_bids(auction_id).await?;
        let own_proxy = proxies.iter().find(|p| p.bidder == submission.bidder);
        let opponent = proxies
            .iter()
            .filter(|p| p.bidder != submission.bidder)
            .max_by(|a, b| a.max_amount.cmp(&b.max_amount));

        let resolution =
            resolver::resolve(&auction, &item, own_proxy, opponent, &submission, now)?;

        let mut changes = ChangeSet::default();

        // Demote the previous highest bid.
        if let Some(previous_id) = auction.highest_bid_id {
            if let Some(mut previous) = self.store.bid(previous_id).await? {
                if previous.status == BidStatus::Winning {
                    previous.status = BidStatus::Outbid;
                    changes.bids.push(previous);
                }
            }
        }

        auction.highest_bid_id = Some(resolution.winning_bid.id);
        auction.bid_count += resolution.rows_created();
        // Tentative winner until the auction closes.
        auction.winner = Some(resolution.winning_bid.bidder);
        item.current_price = Some(resolution.winning_bid.amount);

        if let Some(losing) = &resolution.losing_bid {
            changes.bids.push(losing.clone());
        }
        changes.bids.push(resolution.winning_bid.clone());
        changes.proxy_bids.push(resolution.proxy.clone());
        if let Some(opponent_proxy) = &resolution.opponent_proxy {
            changes.proxy_bids.push(opponent_proxy.clone());
        }
        changes.auctions.push(auction.clone());
        changes.items.push(item);

        self.store.commit(changes).await?;

        let winning_bid = resolution.winning_bid;
        info!(
            auction = %auction_id,
            bidder = %winning_bid.bidder,
            amount = %winning_bid.amount,
            auto = winning_bid.is_auto_bid,
            "bid accepted"
        );

        // Fan-out only after the commit; delivery is best-effort.
        let notice = AuctionNotice::BidUpdate {
            bid: winning_bid.clone(),
        };
        if let Err(e) = self.broadcaster.broadcast(auction_id, &notice).await {
            warn!(auction = %auction_id, "bid broadcast failed: {e}");
        }
        let event = DomainEvent::new(
            EventKind::BidPlaced {
                auction_id,
                bid_id: winning_bid.id,
                bidder: winning_bid.bidder,
                amount: winning_bid.amount,
            },
            now,
        );
        if let Err(e) = self.events.publish(event).await {
            warn!(auction = %auction_id, "bid event publish failed: {e}");
        }

        Ok(winning_bid)
    }
}
