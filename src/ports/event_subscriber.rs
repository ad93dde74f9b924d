//! Inbound lifecycle event port.
//!
//! Receipts, stats caches, and audit logs register handlers for the event
//! types they care about; the bus fans each published envelope out to every
//! matching handler.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// A consumer of lifecycle events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Stable handler name for error reporting.
    fn name(&self) -> &'static str;
}

/// Registration side of the event channel.
pub trait EventSubscriber: Send + Sync {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>);

    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>);
}
