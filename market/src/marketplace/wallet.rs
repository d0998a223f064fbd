use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{MarketError, MarketResult};
use crate::marketplace::{EscrowTxId, OrderId, UserId, WalletId};

/// Custody status of escrowed funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowStatus {
    Pending,
    /// Funds sit in the platform wallet awaiting delivery confirmation.
    Held,
    /// Paid out to the seller. Terminal.
    Released,
    /// Returned to the buyer. Terminal.
    Refunded,
    /// Frozen until resolved by refund or admin release.
    Disputed,
}

/// A user's (or the platform's) money balance.
///
/// Balances only change through ledger operations, and every write carries
/// the version the writer read; a stale version fails the whole commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowWallet {
    pub id: WalletId,

    /// `None` marks the single platform custody wallet.
    pub owner: Option<UserId>,

    pub balance: Decimal,
    pub currency: String,

    /// Optimistic concurrency counter, bumped on every committed write.
    pub version: u64,

    pub created_at: DateTime<Utc>,
}

impl EscrowWallet {
    /// Create an empty wallet for a user.
    pub fn new_user(owner: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: WalletId::new(),
            owner: Some(owner),
            balance: Decimal::ZERO,
            currency: "USD".to_string(),
            version: 0,
            created_at: now,
        }
    }

    /// Create the platform custody wallet.
    pub fn new_platform(now: DateTime<Utc>) -> Self {
        Self {
            id: WalletId::new(),
            owner: None,
            balance: Decimal::ZERO,
            currency: "USD".to_string(),
            version: 0,
            created_at: now,
        }
    }

    pub fn is_platform(&self) -> bool {
        self.owner.is_none()
    }

    /// Add funds.
    pub fn credit(&mut self, amount: Decimal) {
        self.balance += amount;
    }

    /// Remove funds. Balances never go negative.
    pub fn debit(&mut self, amount: Decimal) -> MarketResult<()> {
        if amount > self.balance {
            return Err(MarketError::StateConflict(format!(
                "insufficient funds: balance {} cannot cover {}",
                self.balance, amount
            )));
        }
        self.balance -= amount;
        Ok(())
    }
}

/// The custody record for one order's funds. Unique per order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowTransaction {
    pub id: EscrowTxId,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub debit_wallet: WalletId,
    pub credit_wallet: WalletId,
    pub status: EscrowStatus,

    /// Once shipped, held funds release automatically after this instant.
    pub escrow_release_deadline: Option<DateTime<Utc>>,

    pub payment_method: String,

    /// Reference id of the external payment capture.
    pub external_ref: String,

    pub held_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl EscrowTransaction {
    /// Record a completed capture: funds held, awaiting delivery.
    pub fn held(
        order_id: OrderId,
        amount: Decimal,
        debit_wallet: WalletId,
        credit_wallet: WalletId,
        payment_method: impl Into<String>,
        external_ref: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EscrowTxId::new(),
            order_id,
            amount,
            debit_wallet,
            credit_wallet,
            status: EscrowStatus::Held,
            escrow_release_deadline: None,
            payment_method: payment_method.into(),
            external_ref: external_ref.into(),
            held_at: Some(now),
            released_at: None,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockTime;
    use crate::traits::TimeProvider;
    use rust_decimal_macros::dec;

    #[test]
    fn test_credit_and_debit() {
        let now = MockTime::at_unix(1_000).now();
        let mut wallet = EscrowWallet::new_user(UserId::new(), now);

        wallet.credit(dec!(100));
        assert_eq!(wallet.balance, dec!(100));

        wallet.debit(dec!(40)).unwrap();
        assert_eq!(wallet.balance, dec!(60));
    }

    #[test]
    fn test_debit_rejects_overdraw() {
        let now = MockTime::at_unix(1_000).now();
        let mut wallet = EscrowWallet::new_user(UserId::new(), now);
        wallet.credit(dec!(10));

        let err = wallet.debit(dec!(10.01)).unwrap_err();
        assert!(matches!(err, MarketError::StateConflict(_)));
        // Balance is untouched on failure.
        assert_eq!(wallet.balance, dec!(10));
    }

    #[test]
    fn test_platform_wallet_has_no_owner() {
        let now = MockTime::at_unix(1_000).now();
        assert!(EscrowWallet::new_platform(now).is_platform());
        assert!(!EscrowWallet::new_user(UserId::new(), now).is_platform());
    }

    #[test]
    fn test_held_transaction() {
        let now = MockTime::at_unix(1_000).now();
        let tx = EscrowTransaction::held(
            OrderId::new(),
            dec!(130),
            WalletId::new(),
            WalletId::new(),
            "CARD",
            "ext-1",
            now,
        );

        assert_eq!(tx.status, EscrowStatus::Held);
        assert_eq!(tx.held_at, Some(now));
        assert!(tx.escrow_release_deadline.is_none());
    }
}
