//! Outbound lifecycle event port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Publishes lifecycle events to whatever channel the deployment wires in.
///
/// Repositories publish around writes. A publish failure after a committed
/// transaction must not fail the write; callers log it instead.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}
