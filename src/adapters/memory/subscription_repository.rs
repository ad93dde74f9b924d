//! In-memory subscription repository.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::domain::foundation::{
    DomainError, DonationId, ErrorCode, StateMachine, SubscriptionId, Timestamp,
};
use crate::domain::subscription::{NewSubscription, Subscription, SubscriptionStatus};
use crate::ports::{ActivationOutcome, SubscriptionRepository};

struct StoredSubscription {
    subscription: Subscription,
    initial_donation_id: Option<DonationId>,
}

pub struct InMemorySubscriptionRepository {
    subscriptions: Mutex<HashMap<i64, StoredSubscription>>,
    next_id: AtomicI64,
    fail_next_write: AtomicBool,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            fail_next_write: AtomicBool::new(false),
        }
    }

    /// Makes the next write fail as if the transaction rolled back.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }
}

impl Default for InMemorySubscriptionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn insert(
        &self,
        new_subscription: NewSubscription,
    ) -> Result<Subscription, DomainError> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            error!(payload = ?new_subscription, "failed creating subscription, rolled back");
            return Err(DomainError::persistence("Failed creating a subscription"));
        }

        let subscription = Subscription {
            id: SubscriptionId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
            donor_id: new_subscription.donor_id,
            form_id: new_subscription.form_id,
            status: SubscriptionStatus::Pending,
            period: new_subscription.period,
            frequency: new_subscription.frequency,
            installments: new_subscription.installments,
            initial_amount: new_subscription.initial_amount,
            recurring_amount: new_subscription.recurring_amount,
            recurring_fee_amount: new_subscription.recurring_fee_amount,
            gateway_subscription_id: None,
            transaction_id: None,
            created_at: Timestamp::now(),
        };

        self.subscriptions
            .lock()
            .expect("InMemorySubscriptionRepository: lock poisoned")
            .insert(
                subscription.id.as_i64(),
                StoredSubscription {
                    subscription: subscription.clone(),
                    initial_donation_id: None,
                },
            );

        Ok(subscription)
    }

    async fn get_by_id(&self, id: SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .subscriptions
            .lock()
            .expect("InMemorySubscriptionRepository: lock poisoned")
            .get(&id.as_i64())
            .map(|stored| stored.subscription.clone()))
    }

    async fn get_initial_donation_id(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<DonationId>, DomainError> {
        Ok(self
            .subscriptions
            .lock()
            .expect("InMemorySubscriptionRepository: lock poisoned")
            .get(&id.as_i64())
            .and_then(|stored| stored.initial_donation_id))
    }

    async fn activate(
        &self,
        id: SubscriptionId,
        gateway_subscription_id: &str,
        transaction_id: &str,
        initial_donation_id: DonationId,
    ) -> Result<ActivationOutcome, DomainError> {
        let mut subscriptions = self
            .subscriptions
            .lock()
            .expect("InMemorySubscriptionRepository: lock poisoned");
        let stored = subscriptions.get_mut(&id.as_i64()).ok_or_else(|| {
            DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("subscription {} does not exist", id),
            )
        })?;

        match stored.subscription.status {
            SubscriptionStatus::Pending => {
                stored.subscription.status = SubscriptionStatus::Active;
                stored.subscription.gateway_subscription_id =
                    Some(gateway_subscription_id.to_string());
                stored.subscription.transaction_id = Some(transaction_id.to_string());
                stored.initial_donation_id = Some(initial_donation_id);
                Ok(ActivationOutcome::Activated)
            }
            SubscriptionStatus::Active => Ok(ActivationOutcome::AlreadyActive),
            other => Err(DomainError::new(
                ErrorCode::ValidationFailed,
                format!("cannot activate subscription {} in status {:?}", id, other),
            )),
        }
    }

    async fn update_status(
        &self,
        id: SubscriptionId,
        status: SubscriptionStatus,
    ) -> Result<(), DomainError> {
        let mut subscriptions = self
            .subscriptions
            .lock()
            .expect("InMemorySubscriptionRepository: lock poisoned");
        let stored = subscriptions.get_mut(&id.as_i64()).ok_or_else(|| {
            DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("subscription {} does not exist", id),
            )
        })?;

        if stored.subscription.status.can_transition_to(&status) {
            stored.subscription.status = status;
        } else {
            warn!(
                subscription_id = id.as_i64(),
                from = ?stored.subscription.status,
                to = ?status,
                "ignoring illegal subscription status transition"
            );
        }
        Ok(())
    }
}
