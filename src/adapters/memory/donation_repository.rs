//! In-memory donation repository.
//!
//! Mirrors the transactional contract of the Postgres implementation closely
//! enough for the orchestrator and handler tests: validation before any
//! write, apply-once completion, lifecycle events around each write, and an
//! error-injection switch that stands in for a failed transaction.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, warn};

use crate::domain::donation::events as donation_events;
use crate::domain::donation::{
    generate_purchase_key, Donation, DonationMode, DonationStatus, NewDonation,
};
use crate::domain::foundation::{
    DomainError, DonationId, DonorId, ErrorCode, EventEnvelope, StateMachine, SubscriptionId,
    Timestamp, ValidationError,
};
use crate::ports::{CompletionOutcome, DonationRepository, DonorRepository, EventPublisher};

pub struct InMemoryDonationRepository {
    donations: Mutex<HashMap<i64, Donation>>,
    initial_subscription_donations: Mutex<HashSet<i64>>,
    next_id: AtomicI64,
    donors: Arc<dyn DonorRepository>,
    events: Arc<dyn EventPublisher>,
    default_mode: DonationMode,
    fail_next_write: AtomicBool,
}

impl InMemoryDonationRepository {
    pub fn new(donors: Arc<dyn DonorRepository>, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            donations: Mutex::new(HashMap::new()),
            initial_subscription_donations: Mutex::new(HashSet::new()),
            next_id: AtomicI64::new(1),
            donors,
            events,
            default_mode: DonationMode::Test,
            fail_next_write: AtomicBool::new(false),
        }
    }

    pub fn with_default_mode(mut self, mode: DonationMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// Makes the next write fail as if the transaction rolled back.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// True when the donation was tagged as its subscription's initial
    /// payment.
    pub fn is_initial_subscription_donation(&self, id: DonationId) -> bool {
        self.initial_subscription_donations
            .lock()
            .expect("InMemoryDonationRepository: lock poisoned")
            .contains(&id.as_i64())
    }

    fn take_injected_failure(&self) -> bool {
        self.fail_next_write.swap(false, Ordering::SeqCst)
    }

    async fn publish_lifecycle(&self, event_type: &str, donation: &Donation) {
        let envelope = EventEnvelope::new(
            event_type,
            donation.id.as_i64().to_string(),
            donation_events::DONATION_AGGREGATE,
            json!(donation),
        );
        if let Err(err) = self.events.publish(envelope).await {
            warn!(event_type, error = %err, "failed publishing donation lifecycle event");
        }
    }
}

#[async_trait]
impl DonationRepository for InMemoryDonationRepository {
    async fn insert(&self, new_donation: NewDonation) -> Result<Donation, DomainError> {
        new_donation.validate()?;

        let donor_id = new_donation
            .donor_id
            .ok_or_else(|| ValidationError::missing("donor_id"))?;
        if !self.donors.exists(donor_id).await? {
            return Err(ValidationError::DonorNotFound {
                donor_id: donor_id.as_i64(),
            }
            .into());
        }

        if self.take_injected_failure() {
            error!(payload = ?new_donation, "failed creating donation, rolled back");
            return Err(DomainError::persistence("Failed creating a donation"));
        }

        let id = DonationId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let now = Timestamp::now();

        // validate() checked presence; defaults fill the rest.
        let donation = Donation {
            id,
            status: new_donation.status.unwrap_or(DonationStatus::Pending),
            amount: new_donation
                .amount
                .ok_or_else(|| ValidationError::missing("amount"))?,
            gateway_id: new_donation
                .gateway_id
                .ok_or_else(|| ValidationError::missing("gateway_id"))?,
            donor_id,
            first_name: new_donation
                .first_name
                .ok_or_else(|| ValidationError::missing("first_name"))?,
            last_name: new_donation
                .last_name
                .ok_or_else(|| ValidationError::missing("last_name"))?,
            email: new_donation
                .email
                .ok_or_else(|| ValidationError::missing("email"))?,
            form_id: new_donation
                .form_id
                .ok_or_else(|| ValidationError::missing("form_id"))?,
            mode: new_donation.mode.unwrap_or(self.default_mode),
            purchase_key: new_donation
                .purchase_key
                .unwrap_or_else(generate_purchase_key),
            donor_ip: new_donation
                .donor_ip
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            gateway_transaction_id: new_donation.gateway_transaction_id,
            subscription_id: new_donation.subscription_id,
            parent_id: new_donation.parent_id,
            billing_address: new_donation.billing_address,
            anonymous: new_donation.anonymous,
            level_id: new_donation.level_id,
            created_at: new_donation.created_at.unwrap_or(now),
            updated_at: now,
        };

        self.publish_lifecycle(donation_events::DONATION_CREATING, &donation)
            .await;

        self.donations
            .lock()
            .expect("InMemoryDonationRepository: lock poisoned")
            .insert(id.as_i64(), donation.clone());

        self.publish_lifecycle(donation_events::DONATION_CREATED, &donation)
            .await;

        Ok(donation)
    }

    async fn update(&self, donation: &Donation) -> Result<Donation, DomainError> {
        self.publish_lifecycle(donation_events::DONATION_UPDATING, donation)
            .await;

        if self.take_injected_failure() {
            error!(payload = ?donation, "failed updating donation, rolled back");
            return Err(DomainError::persistence("Failed updating a donation"));
        }

        let mut updated = donation.clone();
        updated.updated_at = Timestamp::now();

        {
            let mut donations = self
                .donations
                .lock()
                .expect("InMemoryDonationRepository: lock poisoned");
            if !donations.contains_key(&donation.id.as_i64()) {
                return Err(DomainError::new(
                    ErrorCode::DonationNotFound,
                    format!("donation {} does not exist", donation.id),
                ));
            }
            // Whole-record replace, same as the meta delete + rewrite.
            donations.insert(donation.id.as_i64(), updated.clone());
        }

        self.publish_lifecycle(donation_events::DONATION_UPDATED, &updated)
            .await;

        Ok(updated)
    }

    async fn delete(&self, donation: &Donation) -> Result<bool, DomainError> {
        self.publish_lifecycle(donation_events::DONATION_DELETING, donation)
            .await;

        if self.take_injected_failure() {
            error!(donation_id = donation.id.as_i64(), "failed deleting donation, rolled back");
            return Err(DomainError::persistence("Failed deleting a donation"));
        }

        let removed = self
            .donations
            .lock()
            .expect("InMemoryDonationRepository: lock poisoned")
            .remove(&donation.id.as_i64())
            .is_some();

        if removed {
            self.publish_lifecycle(donation_events::DONATION_DELETED, donation)
                .await;
        }

        Ok(removed)
    }

    async fn get_by_id(&self, id: DonationId) -> Result<Option<Donation>, DomainError> {
        Ok(self
            .donations
            .lock()
            .expect("InMemoryDonationRepository: lock poisoned")
            .get(&id.as_i64())
            .cloned())
    }

    async fn query_by_donor_id(&self, donor_id: DonorId) -> Result<Vec<Donation>, DomainError> {
        let mut results: Vec<Donation> = self
            .donations
            .lock()
            .expect("InMemoryDonationRepository: lock poisoned")
            .values()
            .filter(|d| d.donor_id == donor_id)
            .cloned()
            .collect();
        results.sort_by_key(|d| std::cmp::Reverse(d.id.as_i64()));
        Ok(results)
    }

    async fn query_by_subscription_id(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<Vec<Donation>, DomainError> {
        let mut results: Vec<Donation> = self
            .donations
            .lock()
            .expect("InMemoryDonationRepository: lock poisoned")
            .values()
            .filter(|d| d.subscription_id == Some(subscription_id))
            .cloned()
            .collect();
        // Newest first
        results.sort_by_key(|d| std::cmp::Reverse(d.id.as_i64()));
        Ok(results)
    }

    async fn complete_payment(
        &self,
        id: DonationId,
        transaction_id: &str,
    ) -> Result<CompletionOutcome, DomainError> {
        let mut donations = self
            .donations
            .lock()
            .expect("InMemoryDonationRepository: lock poisoned");
        let donation = donations.get_mut(&id.as_i64()).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DonationNotFound,
                format!("donation {} does not exist", id),
            )
        })?;

        match donation.status {
            DonationStatus::Pending | DonationStatus::Processing => {
                donation.status = DonationStatus::Complete;
                donation.gateway_transaction_id = Some(transaction_id.to_string());
                donation.updated_at = Timestamp::now();
                Ok(CompletionOutcome::Applied)
            }
            DonationStatus::Complete => Ok(CompletionOutcome::AlreadyApplied),
            other => Err(DomainError::new(
                ErrorCode::ValidationFailed,
                format!("cannot complete donation {} in status {:?}", id, other),
            )),
        }
    }

    async fn mark_processing(
        &self,
        id: DonationId,
        transaction_id: Option<&str>,
    ) -> Result<(), DomainError> {
        let mut donations = self
            .donations
            .lock()
            .expect("InMemoryDonationRepository: lock poisoned");
        let donation = donations.get_mut(&id.as_i64()).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DonationNotFound,
                format!("donation {} does not exist", id),
            )
        })?;

        if donation.status == DonationStatus::Pending {
            donation.status = DonationStatus::Processing;
            if let Some(tx) = transaction_id {
                donation.gateway_transaction_id = Some(tx.to_string());
            }
            donation.updated_at = Timestamp::now();
        }
        Ok(())
    }

    async fn mark_initial_subscription_donation(
        &self,
        id: DonationId,
    ) -> Result<(), DomainError> {
        self.initial_subscription_donations
            .lock()
            .expect("InMemoryDonationRepository: lock poisoned")
            .insert(id.as_i64());
        Ok(())
    }

    async fn update_status(
        &self,
        id: DonationId,
        status: DonationStatus,
    ) -> Result<(), DomainError> {
        let mut donations = self
            .donations
            .lock()
            .expect("InMemoryDonationRepository: lock poisoned");
        let donation = donations.get_mut(&id.as_i64()).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DonationNotFound,
                format!("donation {} does not exist", id),
            )
        })?;

        if donation.status.can_transition_to(&status) {
            donation.status = status;
            donation.updated_at = Timestamp::now();
        } else {
            warn!(
                donation_id = id.as_i64(),
                from = ?donation.status,
                to = ?status,
                "ignoring illegal donation status transition"
            );
        }
        Ok(())
    }

    async fn count_by_donor_id(&self, donor_id: DonorId) -> Result<u64, DomainError> {
        Ok(self
            .donations
            .lock()
            .expect("InMemoryDonationRepository: lock poisoned")
            .values()
            .filter(|d| d.donor_id == donor_id)
            .count() as u64)
    }

    async fn donation_ids_by_donor_id(
        &self,
        donor_id: DonorId,
    ) -> Result<Vec<DonationId>, DomainError> {
        Ok(self
            .query_by_donor_id(donor_id)
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect())
    }
}
