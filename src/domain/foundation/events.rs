//! Lifecycle event infrastructure.
//!
//! Repositories and command handlers announce state changes through an
//! outbound event channel; receipts, stats caches, and audit logs subscribe to
//! it. The envelope carries the entity snapshot as an opaque JSON payload so
//! subscribers never reach back into the repository.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

use super::Timestamp;

/// Unique identifier for a published event (deduplication across redelivery).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Generates a fresh random event id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport wrapper for a lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique id for this event instance.
    pub event_id: EventId,

    /// Event type string used for routing, e.g. `donation.created`.
    pub event_type: String,

    /// Id of the entity the event concerns.
    pub aggregate_id: String,

    /// Kind of entity, e.g. `Donation` or `Subscription`.
    pub aggregate_type: String,

    /// When the event occurred.
    pub occurred_at: Timestamp,

    /// Entity snapshot at the time of the event.
    pub payload: JsonValue,
}

impl EventEnvelope {
    /// Creates an envelope stamped with a fresh id and the current time.
    pub fn new(
        event_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        aggregate_type: impl Into<String>,
        payload: JsonValue,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: event_type.into(),
            aggregate_id: aggregate_id.into(),
            aggregate_type: aggregate_type.into(),
            occurred_at: Timestamp::now(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_envelope_fills_id_and_timestamp() {
        let envelope = EventEnvelope::new("donation.created", "42", "Donation", json!({"id": 42}));

        assert_eq!(envelope.event_type, "donation.created");
        assert_eq!(envelope.aggregate_id, "42");
        assert_eq!(envelope.aggregate_type, "Donation");
        assert_eq!(envelope.payload["id"], 42);
    }

    #[test]
    fn event_ids_are_unique() {
        assert_ne!(EventId::new(), EventId::new());
    }

    #[test]
    fn envelope_serializes_round_trip() {
        let envelope = EventEnvelope::new("donation.deleted", "7", "Donation", json!({}));
        let json = serde_json::to_string(&envelope).unwrap();
        let back: EventEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_id, envelope.event_id);
        assert_eq!(back.event_type, envelope.event_type);
    }
}
