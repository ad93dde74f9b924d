//! Subscription module - Recurring subscriptions and their status lattice.

mod model;
mod status;

pub use model::{NewSubscription, Subscription, SubscriptionPeriod};
pub use status::SubscriptionStatus;
