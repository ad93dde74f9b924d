//! Tracing-backed event publisher.
//!
//! Default production publisher until a real message channel is wired in:
//! every lifecycle event becomes a structured log line, so receipts and audit
//! tooling can be driven off the log pipeline.

use async_trait::async_trait;
use tracing::info;

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::EventPublisher;

pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        info!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            aggregate_id = %event.aggregate_id,
            aggregate_type = %event.aggregate_type,
            "lifecycle event"
        );
        Ok(())
    }
}
