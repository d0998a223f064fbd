//! Auction lifecycle: closing expired auctions and spawning the winner's
//! order.

use tracing::{debug, info, warn};

use crate::error::{MarketError, MarketResult};
use crate::events::{DomainEvent, EventKind};
use crate::marketplace::{
    AuctionId, AuctionStatus, BidStatus, Order, OrderType,
};
use crate::traits::{
    AuctionBroadcaster, AuctionNotice, ChangeSet, EventPublisher, MarketStore, TimeProvider,
};

/// Closes auctions and settles their bid ledger.
pub struct AuctionLifecycle<S, C, B, E>
where
    S: MarketStore,
    C: TimeProvider,
    B: AuctionBroadcaster,
    E: EventPublisher,
{
    store: S,
    time: C,
    broadcaster: B,
    events: E,
}

impl<S, C, B, E> AuctionLifecycle<S, C, B, E>
where
    S: MarketStore,
    C: TimeProvider,
    B: AuctionBroadcaster,
    E: EventPublisher,
{
    pub fn new(store: S, time: C, broadcaster: B, events: E) -> Self {
        Self {
            store,
            time,
            broadcaster,
            events,
        }
    }

    /// Close one auction.
    ///
    /// Idempotent: a second invocation finds the auction no longer `Active`
    /// and returns without touching anything, so overlapping sweeps and
    /// repeated deliveries are harmless. Callers hold the auction's lock.
    pub async fn close_auction(&self, auction_id: AuctionId) -> MarketResult<()> {
        // Re-read the latest committed state; the sweep's snapshot may be
        // stale by the time the lock is ours.
        let mut auction = self
            .store
            .auction(auction_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("auction {auction_id}")))?;

        if auction.status != AuctionStatus::Active {
            debug!(auction = %auction_id, "auction already closed, nothing to do");
            return Ok(());
        }

        let now = self.time.now();
        auction.status = AuctionStatus::Closed;
        auction.closed_at = Some(now);

        let mut changes = ChangeSet::default();

        let winning_bid = match auction.highest_bid_id {
            Some(bid_id) => Some(self.store.bid(bid_id).await?.ok_or_else(|| {
                MarketError::NotFound(format!("highest bid {bid_id} of auction {auction_id}"))
            })?),
            None => None,
        };

        if let Some(winning_bid) = winning_bid {
            auction.winner = Some(winning_bid.bidder);

            // Settle the bid ledger: the highest row wins, the rest lose.
            for mut bid in self.store.bids_by_auction(auction_id).await? {
                let settled = if bid.id == winning_bid.id {
                    BidStatus::Won
                } else {
                    BidStatus::Lost
                };
                if bid.status != settled {
                    bid.status = settled;
                    changes.bids.push(bid);
                }
            }

            let order = Order::new(
                auction.item_id,
                winning_bid.bidder,
                auction.seller,
                OrderType::AuctionWin,
                winning_bid.amount,
                now,
            );
            changes.orders.push(order.clone());
            changes.auctions.push(auction.clone());

            self.store.commit(changes).await?;

            info!(
                auction = %auction_id,
                winner = %winning_bid.bidder,
                amount = %winning_bid.amount,
                order = %order.id,
                "auction closed with winner"
            );

            let notice = AuctionNotice::Ended {
                winning_bid: Some(winning_bid.clone()),
            };
            if let Err(e) = self.broadcaster.broadcast(auction_id, &notice).await {
                warn!(auction = %auction_id, "ended broadcast failed: {e}");
            }
            if let Err(e) = self
                .broadcaster
                .notify_user(
                    winning_bid.bidder,
                    &format!("You won the auction at {}", winning_bid.amount),
                )
                .await
            {
                warn!(auction = %auction_id, "winner notice failed: {e}");
            }

            let event = DomainEvent::new(
                EventKind::AuctionWon {
                    auction_id,
                    item_id: auction.item_id,
                    winner: winning_bid.bidder,
                    amount: winning_bid.amount,
                },
                now,
            );
            if let Err(e) = self.events.publish(event).await {
                warn!(auction = %auction_id, "auction-won event publish failed: {e}");
            }
        } else {
            // Nobody bid; the item stays with the seller for relisting.
            changes.auctions.push(auction.clone());
            self.store.commit(changes).await?;

            info!(auction = %auction_id, "auction closed with no bids");

            let notice = AuctionNotice::Ended { winning_bid: None };
            if let Err(e) = self.broadcaster.broadcast(auction_id, &notice).await {
                warn!(auction = %auction_id, "ended broadcast failed: {e}");
            }
        }

        Ok(())
    }
}
