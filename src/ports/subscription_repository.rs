//! Subscription repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, DonationId, SubscriptionId};
use crate::domain::subscription::{NewSubscription, Subscription, SubscriptionStatus};

/// Result of a conditional activation update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// This call activated the subscription.
    Activated,

    /// The subscription was already active; nothing changed.
    AlreadyActive,
}

/// Persistence port for subscriptions.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn insert(&self, new_subscription: NewSubscription)
        -> Result<Subscription, DomainError>;

    async fn get_by_id(&self, id: SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    /// The subscription's initial donation, once one has been linked.
    async fn get_initial_donation_id(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<DonationId>, DomainError>;

    /// Conditionally activates a pending subscription, recording the
    /// provider's subscription reference, the initial transaction id, and the
    /// initial donation link. Duplicate signals report `AlreadyActive`.
    async fn activate(
        &self,
        id: SubscriptionId,
        gateway_subscription_id: &str,
        transaction_id: &str,
        initial_donation_id: DonationId,
    ) -> Result<ActivationOutcome, DomainError>;

    /// Applies a status transition, logging and skipping illegal ones.
    async fn update_status(
        &self,
        id: SubscriptionId,
        status: SubscriptionStatus,
    ) -> Result<(), DomainError>;
}
