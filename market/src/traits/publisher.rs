//! Outbound domain-event publication.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::events::DomainEvent;

/// Hands committed domain events to the surrounding messaging
/// infrastructure.
///
/// Publication happens after the owning write commits. A failed publish is
/// logged by the caller and not retried; durable delivery is the
/// collaborator's concern.
#[async_trait]
pub trait EventPublisher: Send + Sync + Clone {
    async fn publish(&self, event: DomainEvent) -> Result<()>;
}

/// Default publisher that serializes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventPublisher;

impl LoggingEventPublisher {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: DomainEvent) -> Result<()> {
        let payload = serde_json::to_string(&event)?;
        info!(event = %payload, "domain event");
        Ok(())
    }
}
