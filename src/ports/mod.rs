//! Ports module - Trait boundaries between the domain and the outside world.
//!
//! Adapters implement these traits; the domain and orchestrator depend only on
//! the traits.

mod donation_repository;
mod donor_repository;
mod event_publisher;
mod event_subscriber;
mod gateway_adapter;
mod subscription_repository;

pub use donation_repository::{CompletionOutcome, DonationRepository};
pub use donor_repository::{Donor, DonorRepository};
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventHandler, EventSubscriber};
pub use gateway_adapter::{
    GatewayAdapter, GatewayRouteContext, RouteMethodArgs, SubscriptionModule,
};
pub use subscription_repository::{ActivationOutcome, SubscriptionRepository};
