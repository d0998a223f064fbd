//! Escrow ledger: wallet bookkeeping and the custody state machine.
//!
//! Every operation commits its wallet, transaction, and order writes as one
//! change set. Wallet writes are version-checked by the store, so two
//! operations racing on the same wallet cannot both apply; the loser
//! re-reads and retries up to a bounded number of attempts.

use std::future::Future;
use tracing::{debug, info, warn};

use crate::config::{platform_fee_rate, WALLET_COMMIT_MAX_RETRIES};
use crate::error::{MarketError, MarketResult};
use crate::events::{DomainEvent, EventKind};
use crate::marketplace::{
    EscrowStatus, EscrowTransaction, EscrowWallet, Order, OrderId, OrderStatus, UserId,
};
use crate::traits::{ChangeSet, EventPublisher, MarketStore, TimeProvider};
use rust_decimal::Decimal;

/// Retry a ledger operation whose commit lost a wallet version race.
/// Anything other than a concurrency failure surfaces immediately.
async fn with_wallet_retry<T, F, Fut>(op: &'static str, f: F) -> MarketResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = MarketResult<T>>,
{
    let mut attempt = 1;
    loop {
        match f().await {
            Err(e @ MarketError::Concurrency(_)) if attempt < WALLET_COMMIT_MAX_RETRIES => {
                debug!(op, attempt, "wallet commit conflict, retrying: {e}");
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Moves money between buyer, platform, and seller wallets while an order
/// works through payment, delivery, and disputes.
pub struct EscrowLedger<S, C, E>
where
    S: MarketStore,
    C: TimeProvider,
    E: EventPublisher,
{
    store: S,
    time: C,
    events: E,
}

impl<S, C, E> EscrowLedger<S, C, E>
where
    S: MarketStore,
    C: TimeProvider,
    E: EventPublisher,
{
    pub fn new(store: S, time: C, events: E) -> Self {
        Self {
            store,
            time,
            events,
        }
    }

    /// The user's wallet, or a fresh empty one that the next commit will
    /// create.
    async fn wallet_for(&self, user: UserId) -> MarketResult<EscrowWallet> {
        match self.store.wallet_for_user(user).await? {
            Some(wallet) => Ok(wallet),
            None => Ok(EscrowWallet::new_user(user, self.time.now())),
        }
    }

    /// The platform custody wallet, created on first use.
    async fn platform(&self) -> MarketResult<EscrowWallet> {
        match self.store.platform_wallet().await? {
            Some(wallet) => Ok(wallet),
            None => Ok(EscrowWallet::new_platform(self.time.now())),
        }
    }

    async fn order_or_not_found(&self, order_id: OrderId) -> MarketResult<Order> {
        self.store
            .order(order_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("order {order_id}")))
    }

    async fn tx_or_not_found(&self, order_id: OrderId) -> MarketResult<EscrowTransaction> {
        self.store.escrow_tx_for_order(order_id).await?.ok_or_else(|| {
            MarketError::NotFound(format!("no escrow transaction for order {order_id}"))
        })
    }

    /// Capture the buyer's payment and take the funds into custody.
    ///
    /// The external gateway already charged the buyer; here the amount is
    /// deposited into their wallet and immediately moved to the platform
    /// wallet, where it stays `Held` until delivery is confirmed.
    pub async fn process_payment(
        &self,
        order_id: OrderId,
        amount: Decimal,
        payment_method: &str,
        external_ref: &str,
    ) -> MarketResult<EscrowTransaction> {
        with_wallet_retry("process_payment", || {
            self.try_process_payment(order_id, amount, payment_method, external_ref)
        })
        .await
    }

    async fn try_process_payment(
        &self,
        order_id: OrderId,
        amount: Decimal,
        payment_method: &str,
        external_ref: &str,
    ) -> MarketResult<EscrowTransaction> {
        let mut order = self.order_or_not_found(order_id).await?;

        if order.status != OrderStatus::PendingPayment {
            return Err(MarketError::StateConflict(format!(
                "order {order_id} is {:?}, payment requires PendingPayment",
                order.status
            )));
        }
        if amount != order.amount {
            return Err(MarketError::Validation(format!(
                "payment amount mismatch: expected {}, got {amount}",
                order.amount
            )));
        }
        // A transaction row already existing means this payment was
        // submitted twice.
        if self.store.escrow_tx_for_order(order_id).await?.is_some() {
            return Err(MarketError::StateConflict(format!(
                "a transaction already exists for order {order_id}"
            )));
        }

        let now = self.time.now();
        let mut buyer_wallet = self.wallet_for(order.buyer).await?;
        let mut platform_wallet = self.platform().await?;

        // Deposit the captured amount, then move it into custody.
        buyer_wallet.credit(amount);
        buyer_wallet.debit(amount)?;
        platform_wallet.credit(amount);

        let tx = EscrowTransaction::held(
            order_id,
            amount,
            buyer_wallet.id,
            platform_wallet.id,
            payment_method,
            external_ref,
            now,
        );
        order.status = OrderStatus::Paid;

        self.store
            .commit(ChangeSet {
                wallets: vec![buyer_wallet, platform_wallet],
                escrow_txs: vec![tx.clone()],
                orders: vec![order.clone()],
                ..Default::default()
            })
            .await?;

        info!(order = %order_id, %amount, external_ref, "payment captured, funds held in escrow");

        let event = DomainEvent::new(
            EventKind::OrderPaid {
                order_id,
                buyer: order.buyer,
                amount,
            },
            now,
        );
        if let Err(e) = self.events.publish(event).await {
            warn!(order = %order_id, "order-paid event publish failed: {e}");
        }

        Ok(tx)
    }

    /// Pay the seller out of custody, retaining the platform fee.
    pub async fn release_escrow(&self, order_id: OrderId) -> MarketResult<()> {
        with_wallet_retry("release_escrow", || self.try_release_escrow(order_id)).await
    }

    async fn try_release_escrow(&self, order_id: OrderId) -> MarketResult<()> {
        let mut order = self.order_or_not_found(order_id).await?;
        let mut tx = self.tx_or_not_found(order_id).await?;

        if tx.status != EscrowStatus::Held {
            return Err(MarketError::StateConflict(format!(
                "escrow for order {order_id} is {:?}, release requires Held",
                tx.status
            )));
        }

        let now = self.time.now();
        let mut platform_wallet = self.platform().await?;
        let mut seller_wallet = self.wallet_for(order.seller).await?;

        let platform_fee = (tx.amount * platform_fee_rate()).round_dp(2);
        let seller_amount = tx.amount - platform_fee;

        // The full amount leaves custody; the fee returns to the platform
        // wallet as revenue.
        platform_wallet.debit(tx.amount)?;
        seller_wallet.credit(seller_amount);
        platform_wallet.credit(platform_fee);

        tx.status = EscrowStatus::Released;
        tx.released_at = Some(now);
        order.status = OrderStatus::Completed;

        self.store
            .commit(ChangeSet {
                wallets: vec![platform_wallet, seller_wallet],
                escrow_txs: vec![tx],
                orders: vec![order.clone()],
                ..Default::default()
            })
            .await?;

        info!(
            order = %order_id,
            seller = %order.seller,
            %seller_amount,
            %platform_fee,
            "escrow released"
        );

        let event = DomainEvent::new(
            EventKind::EscrowReleased {
                order_id,
                seller: order.seller,
                amount: seller_amount,
            },
            now,
        );
        if let Err(e) = self.events.publish(event).await {
            warn!(order = %order_id, "escrow-released event publish failed: {e}");
        }

        Ok(())
    }

    /// Return the full held amount to the buyer.
    ///
    /// Accepts `Held` or `Disputed` custody; refunding is the one way a
    /// disputed transaction resolves besides an admin-forced release.
    pub async fn refund_buyer(&self, order_id: OrderId) -> MarketResult<()> {
        with_wallet_retry("refund_buyer", || self.try_refund_buyer(order_id)).await
    }

    async fn try_refund_buyer(&self, order_id: OrderId) -> MarketResult<()> {
        let mut order = self.order_or_not_found(order_id).await?;
        let mut tx = self.tx_or_not_found(order_id).await?;

        if !matches!(tx.status, EscrowStatus::Held | EscrowStatus::Disputed) {
            return Err(MarketError::StateConflict(format!(
                "escrow for order {order_id} is {:?}, refund requires Held or Disputed",
                tx.status
            )));
        }

        let mut platform_wallet = self.platform().await?;
        let mut buyer_wallet = self.wallet_for(order.buyer).await?;

        platform_wallet.debit(tx.amount)?;
        buyer_wallet.credit(tx.amount);

        tx.status = EscrowStatus::Refunded;
        order.status = OrderStatus::Refunded;

        self.store
            .commit(ChangeSet {
                wallets: vec![platform_wallet, buyer_wallet],
                escrow_txs: vec![tx],
                orders: vec![order],
                ..Default::default()
            })
            .await?;

        info!(order = %order_id, "escrow refunded to buyer");
        Ok(())
    }

    /// Freeze held funds while a dispute runs.
    pub async fn dispute(&self, order_id: OrderId, reason: &str) -> MarketResult<()> {
        let mut order = self.order_or_not_found(order_id).await?;
        let mut tx = self.tx_or_not_found(order_id).await?;

        if tx.status != EscrowStatus::Held {
            return Err(MarketError::StateConflict(format!(
                "escrow for order {order_id} is {:?}, dispute requires Held",
                tx.status
            )));
        }

        let now = self.time.now();
        tx.status = EscrowStatus::Disputed;
        order.status = OrderStatus::Disputed;

        self.store
            .commit(ChangeSet {
                escrow_txs: vec![tx],
                orders: vec![order],
                ..Default::default()
            })
            .await?;

        info!(order = %order_id, reason, "escrow disputed, funds frozen");

        let event = DomainEvent::new(
            EventKind::DisputeOpened {
                order_id,
                reason: reason.to_string(),
            },
            now,
        );
        if let Err(e) = self.events.publish(event).await {
            warn!(order = %order_id, "dispute event publish failed: {e}");
        }

        Ok(())
    }
}
