//! Proxy-bid competition resolution.
//!
//! Pure decision logic: given an auction snapshot and an incoming bid,
//! compute the resulting highest bid and the rows to persist. No storage
//! or clock access happens here, which keeps every branch directly
//! testable.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::{MarketError, MarketResult};
use crate::marketplace::{Auction, Bid, BidStatus, Item, ProxyBid, UserId};

/// An incoming bid request.
#[derive(Debug, Clone)]
pub struct BidSubmission {
    pub bidder: UserId,

    /// The visible amount the bidder wants on the board now.
    pub amount: Decimal,

    /// Optional ceiling the system may bid up to on their behalf.
    pub max_proxy: Option<Decimal>,
}

/// The outcome of resolving one submission.
///
/// `winning_bid` is the new highest bid of the auction. When the opponent's
/// proxy out-bids the submitter it belongs to the opponent, not the
/// submitter; callers must not assume otherwise.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub winning_bid: Bid,

    /// The submitter's recorded bid when their submission lost to a
    /// stronger proxy.
    pub losing_bid: Option<Bid>,

    /// The submitter's proxy ceiling after this submission.
    pub proxy: ProxyBid,

    /// The opponent's proxy, when it fired and moved its current amount.
    pub opponent_proxy: Option<ProxyBid>,
}

impl Resolution {
    /// How many bid rows this resolution created (1, or 2 when the
    /// opponent's proxy auto-fired over a recorded losing bid).
    pub fn rows_created(&self) -> u32 {
        1 + u32::from(self.losing_bid.is_some())
    }

    pub fn submitter_won(&self) -> bool {
        self.losing_bid.is_none()
    }
}

/// The minimum acceptable bid for the auction's current state: the reserve
/// price for the opening bid when one is set, otherwise one increment above
/// the current price.
pub fn minimum_bid(auction: &Auction, item: &Item) -> Decimal {
    if auction.bid_count == 0 {
        if let Some(reserve) = auction.reserve_price {
            return reserve;
        }
    }
    let current = item
        .current_price
        .or(auction.reserve_price)
        .unwrap_or(Decimal::ZERO);
    current + auction.min_bid_increment
}

/// Resolve one submission against the auction's proxy-bid competition.
///
/// `opponent` is the highest-ceiling active proxy belonging to a different
/// bidder; lower opponents are dominated and never change the outcome.
/// Ties go to the opponent, who held the ceiling first.
pub fn resolve(
    auction: &Auction,
    item: &Item,
    own_proxy: Option<&ProxyBid>,
    opponent: Option<&ProxyBid>,
    submission: &BidSubmission,
    now: DateTime<Utc>,
) -> MarketResult<Resolution> {
    let min_bid = minimum_bid(auction, item);
    if submission.amount < min_bid {
        return Err(MarketError::Validation(format!(
            "bid must be at least {min_bid}, got {}",
            submission.amount
        )));
    }

    let effective_max = submission
        .max_proxy
        .map_or(submission.amount, |m| m.max(submission.amount));

    let mut proxy = match own_proxy {
        Some(existing) => {
            let mut updated = existing.clone();
            updated.raise_ceiling(effective_max, now);
            updated
        }
        None => ProxyBid::new(auction.id, submission.bidder, effective_max, now),
    };

    let increment = auction.min_bid_increment;

    let Some(opponent) = opponent else {
        // No competing ceiling: the visible amount wins as-is.
        let mut winning_bid = Bid::new(
            auction.id,
            submission.bidder,
            submission.amount,
            false,
            false,
            now,
        );
        winning_bid.status = BidStatus::Winning;
        proxy.current_amount = submission.amount;
        return Ok(Resolution {
            winning_bid,
            losing_bid: None,
            proxy,
            opponent_proxy: None,
        });
    };

    if effective_max > opponent.max_amount {
        // The submitter clears the opponent's ceiling and pays one
        // increment above it, capped by their own ceiling.
        let price = effective_max.min(opponent.max_amount + increment);
        let is_auto = submission.max_proxy.is_some() && price != submission.amount;
        let mut winning_bid = Bid::new(
            auction.id,
            submission.bidder,
            price,
            is_auto,
            submission.max_proxy.is_some(),
            now,
        );
        winning_bid.status = BidStatus::Winning;
        proxy.current_amount = price;
        Ok(Resolution {
            winning_bid,
            losing_bid: None,
            proxy,
            opponent_proxy: None,
        })
    } else {
        // The opponent's ceiling holds: record the submitter's losing bid,
        // then the opponent's proxy fires just above it.
        let mut losing_bid = Bid::new(
            auction.id,
            submission.bidder,
            submission.amount,
            false,
            false,
            now,
        );
        losing_bid.status = BidStatus::Outbid;

        let price = opponent.max_amount.min(submission.amount + increment);
        let mut winning_bid = Bid::new(auction.id, opponent.bidder, price, true, true, now);
        winning_bid.status = BidStatus::Winning;

        let mut opponent_proxy = opponent.clone();
        opponent_proxy.current_amount = price;
        opponent_proxy.updated_at = now;

        Ok(Resolution {
            winning_bid,
            losing_bid: Some(losing_bid),
            proxy,
            opponent_proxy: Some(opponent_proxy),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::AuctionStatus;
    use crate::mocks::MockTime;
    use crate::traits::TimeProvider;
    use rust_decimal_macros::dec;

    struct Fixture {
        auction: Auction,
        item: Item,
        now: DateTime<Utc>,
    }

    /// Auction at current price 100 with increment 10 and one prior bid.
    fn fixture() -> Fixture {
        let time = MockTime::at_unix(1_000);
        let seller = UserId::new();
        let mut item = Item::new(seller, "Test item");
        item.current_price = Some(dec!(100));

        let mut auction = Auction::builder_with_time(time.clone())
            .item(item.id)
            .seller(seller)
            .min_bid_increment(dec!(10))
            .reserve_price(dec!(100))
            .duration_secs(3_600)
            .build()
            .unwrap();
        auction.status = AuctionStatus::Active;
        auction.bid_count = 1;

        Fixture {
            auction,
            item,
            now: time.now(),
        }
    }

    fn submission(amount: Decimal, max_proxy: Option<Decimal>) -> BidSubmission {
        BidSubmission {
            bidder: UserId::new(),
            amount,
            max_proxy,
        }
    }

    #[test]
    fn test_below_minimum_rejected() {
        let f = fixture();
        let err = resolve(&f.auction, &f.item, None, None, &submission(dec!(105), None), f.now)
            .unwrap_err();
        assert!(matches!(err, MarketError::Validation(_)));
    }

    #[test]
    fn test_first_bid_must_meet_reserve() {
        let mut f = fixture();
        f.auction.bid_count = 0;
        f.item.current_price = None;

        let err = resolve(&f.auction, &f.item, None, None, &submission(dec!(99), None), f.now)
            .unwrap_err();
        assert!(matches!(err, MarketError::Validation(_)));

        // Exactly the reserve is accepted for the opening bid.
        let resolution =
            resolve(&f.auction, &f.item, None, None, &submission(dec!(100), None), f.now).unwrap();
        assert_eq!(resolution.winning_bid.amount, dec!(100));
    }

    #[test]
    fn test_no_opponent_wins_at_visible_amount() {
        let f = fixture();
        let sub = submission(dec!(120), None);

        let resolution = resolve(&f.auction, &f.item, None, None, &sub, f.now).unwrap();

        assert_eq!(resolution.winning_bid.amount, dec!(120));
        assert_eq!(resolution.winning_bid.bidder, sub.bidder);
        assert!(!resolution.winning_bid.is_auto_bid);
        assert!(resolution.submitter_won());
        assert_eq!(resolution.rows_created(), 1);
        assert_eq!(resolution.proxy.max_amount, dec!(120));
    }

    #[test]
    fn test_stronger_opponent_proxy_outbids_submitter() {
        let f = fixture();
        let opponent = ProxyBid::new(f.auction.id, UserId::new(), dec!(150), f.now);
        let sub = submission(dec!(120), None);

        let resolution =
            resolve(&f.auction, &f.item, None, Some(&opponent), &sub, f.now).unwrap();

        // Opponent auto-fires at 120 + 10, capped by their 150 ceiling.
        assert_eq!(resolution.winning_bid.amount, dec!(130));
        assert_eq!(resolution.winning_bid.bidder, opponent.bidder);
        assert!(resolution.winning_bid.is_auto_bid);
        assert!(!resolution.submitter_won());
        assert_eq!(resolution.rows_created(), 2);

        let losing = resolution.losing_bid.unwrap();
        assert_eq!(losing.amount, dec!(120));
        assert_eq!(losing.bidder, sub.bidder);
        assert_eq!(losing.status, BidStatus::Outbid);

        assert_eq!(resolution.opponent_proxy.unwrap().current_amount, dec!(130));
    }

    #[test]
    fn test_submitter_ceiling_beats_opponent() {
        let f = fixture();
        let opponent = ProxyBid::new(f.auction.id, UserId::new(), dec!(100), f.now);
        let sub = submission(dec!(120), Some(dec!(150)));

        let resolution =
            resolve(&f.auction, &f.item, None, Some(&opponent), &sub, f.now).unwrap();

        // One increment over the opponent's 100 ceiling.
        assert_eq!(resolution.winning_bid.amount, dec!(110));
        assert_eq!(resolution.winning_bid.bidder, sub.bidder);
        assert!(resolution.winning_bid.is_auto_bid);
        assert!(resolution.submitter_won());
        assert_eq!(resolution.proxy.max_amount, dec!(150));
    }

    #[test]
    fn test_submitter_wins_capped_by_own_ceiling() {
        let f = fixture();
        let opponent = ProxyBid::new(f.auction.id, UserId::new(), dec!(145), f.now);
        let sub = submission(dec!(120), Some(dec!(150)));

        let resolution =
            resolve(&f.auction, &f.item, None, Some(&opponent), &sub, f.now).unwrap();

        // 145 + 10 exceeds the submitter's 150 ceiling, so they pay 150.
        assert_eq!(resolution.winning_bid.amount, dec!(150));
        assert_eq!(resolution.winning_bid.bidder, sub.bidder);
    }

    #[test]
    fn test_tie_goes_to_opponent() {
        let f = fixture();
        let opponent = ProxyBid::new(f.auction.id, UserId::new(), dec!(150), f.now);
        let sub = submission(dec!(120), Some(dec!(150)));

        let resolution =
            resolve(&f.auction, &f.item, None, Some(&opponent), &sub, f.now).unwrap();

        assert!(!resolution.submitter_won());
        assert_eq!(resolution.winning_bid.bidder, opponent.bidder);
        // The opponent only has to beat the visible 120, not the tied
        // ceiling.
        assert_eq!(resolution.winning_bid.amount, dec!(130));
    }

    #[test]
    fn test_own_ceiling_raised_not_replaced() {
        let f = fixture();
        let sub = submission(dec!(120), Some(dec!(140)));
        let existing = ProxyBid::new(f.auction.id, sub.bidder, dec!(160), f.now);

        let resolution =
            resolve(&f.auction, &f.item, Some(&existing), None, &sub, f.now).unwrap();

        // The older, higher ceiling survives.
        assert_eq!(resolution.proxy.max_amount, dec!(160));
    }

    #[test]
    fn test_winning_without_ceiling_is_not_auto() {
        let f = fixture();
        let opponent = ProxyBid::new(f.auction.id, UserId::new(), dec!(110), f.now);
        // Plain 120 clears the 110 ceiling without any proxy of its own.
        let sub = submission(dec!(120), None);

        let resolution =
            resolve(&f.auction, &f.item, None, Some(&opponent), &sub, f.now).unwrap();

        assert_eq!(resolution.winning_bid.amount, dec!(120));
        assert!(!resolution.winning_bid.is_auto_bid);
        assert!(!resolution.winning_bid.is_proxy_bid);
    }

    #[test]
    fn test_minimum_bid_uses_increment_after_first_bid() {
        let f = fixture();
        assert_eq!(minimum_bid(&f.auction, &f.item), dec!(110));
    }

    #[test]
    fn test_minimum_bid_without_reserve_or_price() {
        let mut f = fixture();
        f.auction.bid_count = 0;
        f.auction.reserve_price = None;
        f.item.current_price = None;

        assert_eq!(minimum_bid(&f.auction, &f.item), dec!(10));
    }
}
