//! Mock event publisher recording published domain events.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::events::DomainEvent;
use crate::traits::EventPublisher;

/// Mock publisher for testing. Records events in order and can simulate
/// publish failures.
#[derive(Debug, Clone, Default)]
pub struct MockEventPublisher {
    events: Arc<Mutex<Vec<DomainEvent>>>,
    fail_mode: Arc<AtomicBool>,
}

impl MockEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every publish fail until disabled.
    pub fn set_fail_mode(&self, fail: bool) {
        self.fail_mode.store(fail, Ordering::SeqCst);
    }

    /// Every event published so far, in publish order.
    pub async fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().await.clone()
    }

    pub async fn event_count(&self) -> usize {
        self.events.lock().await.len()
    }
}

#[async_trait]
impl EventPublisher for MockEventPublisher {
    async fn publish(&self, event: DomainEvent) -> Result<()> {
        if self.fail_mode.load(Ordering::SeqCst) {
            return Err(anyhow!("MockEventPublisher: simulated publish failure"));
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}
