//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types that form the
//! vocabulary of the donation domain.

mod errors;
mod events;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{EventEnvelope, EventId};
pub use ids::{DonationId, DonorId, FormId, SubscriptionId};
pub use money::Money;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
