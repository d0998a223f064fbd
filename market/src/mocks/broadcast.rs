//! Mock broadcaster recording every pushed notice.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::marketplace::{AuctionId, UserId};
use crate::traits::{AuctionBroadcaster, AuctionNotice};

/// Mock push channel for testing. Records everything it is asked to send
/// and can be switched into a failing mode to exercise best-effort paths.
#[derive(Debug, Clone, Default)]
pub struct MockBroadcaster {
    notices: Arc<Mutex<Vec<(AuctionId, AuctionNotice)>>>,
    user_notices: Arc<Mutex<Vec<(UserId, String)>>>,
    fail_mode: Arc<AtomicBool>,
}

impl MockBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send fail until disabled.
    pub fn set_fail_mode(&self, fail: bool) {
        self.fail_mode.store(fail, Ordering::SeqCst);
    }

    /// All auction-scoped notices sent so far.
    pub async fn notices(&self) -> Vec<(AuctionId, AuctionNotice)> {
        self.notices.lock().await.clone()
    }

    /// Notices sent for one auction.
    pub async fn notices_for(&self, auction_id: AuctionId) -> Vec<AuctionNotice> {
        self.notices
            .lock()
            .await
            .iter()
            .filter(|(id, _)| *id == auction_id)
            .map(|(_, n)| n.clone())
            .collect()
    }

    /// All per-user notices sent so far.
    pub async fn user_notices(&self) -> Vec<(UserId, String)> {
        self.user_notices.lock().await.clone()
    }
}

#[async_trait]
impl AuctionBroadcaster for MockBroadcaster {
    async fn broadcast(&self, auction_id: AuctionId, notice: &AuctionNotice) -> Result<()> {
        if self.fail_mode.load(Ordering::SeqCst) {
            return Err(anyhow!("MockBroadcaster: simulated delivery failure"));
        }
        self.notices.lock().await.push((auction_id, notice.clone()));
        Ok(())
    }

    async fn notify_user(&self, user: UserId, message: &str) -> Result<()> {
        if self.fail_mode.load(Ordering::SeqCst) {
            return Err(anyhow!("MockBroadcaster: simulated delivery failure"));
        }
        self.user_notices
            .lock()
            .await
            .push((user, message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_notices() {
        let broadcaster = MockBroadcaster::new();
        let auction_id = AuctionId::new();

        broadcaster
            .broadcast(auction_id, &AuctionNotice::Ended { winning_bid: None })
            .await
            .unwrap();

        assert_eq!(broadcaster.notices_for(auction_id).await.len(), 1);
        assert!(broadcaster.notices_for(AuctionId::new()).await.is_empty());
    }

    #[tokio::test]
    async fn test_fail_mode() {
        let broadcaster = MockBroadcaster::new();
        broadcaster.set_fail_mode(true);

        let result = broadcaster
            .broadcast(AuctionId::new(), &AuctionNotice::Ended { winning_bid: None })
            .await;
        assert!(result.is_err());
        assert!(broadcaster.notices().await.is_empty());
    }
}
