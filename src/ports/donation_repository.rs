//! Donation repository port.

use async_trait::async_trait;

use crate::domain::donation::{Donation, DonationStatus, NewDonation};
use crate::domain::foundation::{DomainError, DonationId, DonorId, SubscriptionId};

/// Result of a conditional completion update.
///
/// Completion may be signaled more than once per donation (browser return and
/// webhook racing, or a webhook redelivered). The repository applies the flip
/// exactly once and reports which side of the race the caller was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// This call flipped the donation to complete.
    Applied,

    /// The donation was already complete; nothing changed.
    AlreadyApplied,
}

/// Persistence port for donations.
///
/// Writes are atomic: the entity row and every derived meta row commit
/// together or not at all. Implementations publish lifecycle events around
/// each write.
#[async_trait]
pub trait DonationRepository: Send + Sync {
    /// Validates, then atomically inserts the donation and its meta rows.
    ///
    /// Validation failures are raised before any transaction opens. On
    /// storage failure the transaction rolls back, the attempted payload is
    /// logged, and a persistence error is returned.
    async fn insert(&self, new_donation: NewDonation) -> Result<Donation, DomainError>;

    /// Atomically replaces the stored record with `donation`.
    ///
    /// Meta rows are deleted and rewritten from the given record, so
    /// attributes absent from it do not survive the update.
    async fn update(&self, donation: &Donation) -> Result<Donation, DomainError>;

    /// Removes the entity row and all meta rows. Returns false when the id
    /// does not exist.
    async fn delete(&self, donation: &Donation) -> Result<bool, DomainError>;

    async fn get_by_id(&self, id: DonationId) -> Result<Option<Donation>, DomainError>;

    async fn query_by_donor_id(&self, donor_id: DonorId) -> Result<Vec<Donation>, DomainError>;

    /// Initial donation plus renewals for a subscription, newest first.
    async fn query_by_subscription_id(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<Vec<Donation>, DomainError>;

    /// Conditionally flips the donation to complete and records the gateway
    /// transaction id. Applies only while the donation is pending or
    /// processing; duplicate signals report `AlreadyApplied`.
    async fn complete_payment(
        &self,
        id: DonationId,
        transaction_id: &str,
    ) -> Result<CompletionOutcome, DomainError>;

    /// Moves a pending donation to processing, recording the transaction id
    /// when the gateway supplied one. No-op if the donation already left
    /// pending.
    async fn mark_processing(
        &self,
        id: DonationId,
        transaction_id: Option<&str>,
    ) -> Result<(), DomainError>;

    /// Tags the donation as the initial payment of its subscription.
    async fn mark_initial_subscription_donation(&self, id: DonationId)
        -> Result<(), DomainError>;

    /// Applies a status transition, logging and skipping illegal ones.
    async fn update_status(
        &self,
        id: DonationId,
        status: DonationStatus,
    ) -> Result<(), DomainError>;

    async fn count_by_donor_id(&self, donor_id: DonorId) -> Result<u64, DomainError>;

    async fn donation_ids_by_donor_id(
        &self,
        donor_id: DonorId,
    ) -> Result<Vec<DonationId>, DomainError>;
}
