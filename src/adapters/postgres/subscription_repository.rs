//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;

use crate::domain::foundation::{
    DomainError, DonationId, DonorId, ErrorCode, FormId, Money, StateMachine, SubscriptionId,
    Timestamp,
};
use crate::domain::subscription::{
    NewSubscription, Subscription, SubscriptionPeriod, SubscriptionStatus,
};
use crate::ports::{ActivationOutcome, SubscriptionRepository};

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: i64,
    donor_id: i64,
    form_id: i64,
    status: String,
    period: String,
    frequency: i32,
    installments: i32,
    initial_amount: i64,
    recurring_amount: i64,
    recurring_fee_amount: i64,
    currency: String,
    gateway_subscription_id: Option<String>,
    transaction_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let money = |amount: i64| {
            Money::new(amount, &row.currency).map_err(|e| DomainError::database(e.to_string()))
        };
        Ok(Subscription {
            id: SubscriptionId::new(row.id),
            donor_id: DonorId::new(row.donor_id),
            form_id: FormId::new(row.form_id),
            status: SubscriptionStatus::from_db_str(&row.status)
                .map_err(|e| DomainError::database(e.to_string()))?,
            period: SubscriptionPeriod::from_str_loose(&row.period)
                .map_err(|e| DomainError::database(e.to_string()))?,
            frequency: row.frequency as u32,
            installments: row.installments as u32,
            initial_amount: money(row.initial_amount)?,
            recurring_amount: money(row.recurring_amount)?,
            recurring_fee_amount: money(row.recurring_fee_amount)?,
            gateway_subscription_id: row.gateway_subscription_id,
            transaction_id: row.transaction_id,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

const SELECT_COLUMNS: &str = "id, donor_id, form_id, status, period, frequency, installments, \
     initial_amount, recurring_amount, recurring_fee_amount, currency, \
     gateway_subscription_id, transaction_id, created_at";

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn insert(
        &self,
        new_subscription: NewSubscription,
    ) -> Result<Subscription, DomainError> {
        let now = Timestamp::now();
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "INSERT INTO subscriptions (
                donor_id, form_id, status, period, frequency, installments,
                initial_amount, recurring_amount, recurring_fee_amount, currency, created_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {}",
            SELECT_COLUMNS
        ))
        .bind(new_subscription.donor_id.as_i64())
        .bind(new_subscription.form_id.as_i64())
        .bind(SubscriptionStatus::Pending.as_db_str())
        .bind(new_subscription.period.as_str())
        .bind(new_subscription.frequency as i32)
        .bind(new_subscription.installments as i32)
        .bind(new_subscription.initial_amount.amount_minor())
        .bind(new_subscription.recurring_amount.amount_minor())
        .bind(new_subscription.recurring_fee_amount.amount_minor())
        .bind(new_subscription.initial_amount.currency())
        .bind(now.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed creating subscription, rolled back");
            DomainError::persistence("Failed creating a subscription")
        })?;

        row.try_into()
    }

    async fn get_by_id(&self, id: SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(e.to_string()))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn get_initial_donation_id(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<DonationId>, DomainError> {
        let row: Option<(Option<i64>,)> =
            sqlx::query_as("SELECT initial_donation_id FROM subscriptions WHERE id = $1")
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(e.to_string()))?;

        Ok(row.and_then(|(donation_id,)| donation_id.map(DonationId::new)))
    }

    async fn activate(
        &self,
        id: SubscriptionId,
        gateway_subscription_id: &str,
        transaction_id: &str,
        initial_donation_id: DonationId,
    ) -> Result<ActivationOutcome, DomainError> {
        // Conditional update is the apply-once guard under duplicate signals.
        let affected = sqlx::query(
            "UPDATE subscriptions
             SET status = 'active', gateway_subscription_id = $2, transaction_id = $3,
                 initial_donation_id = $4
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id.as_i64())
        .bind(gateway_subscription_id)
        .bind(transaction_id)
        .bind(initial_donation_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(e.to_string()))?
        .rows_affected();

        if affected > 0 {
            return Ok(ActivationOutcome::Activated);
        }

        let status: Option<(String,)> =
            sqlx::query_as("SELECT status FROM subscriptions WHERE id = $1")
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(e.to_string()))?;

        match status {
            Some((status,)) if status == "active" => Ok(ActivationOutcome::AlreadyActive),
            Some((status,)) => Err(DomainError::new(
                ErrorCode::ValidationFailed,
                format!("cannot activate subscription {} in status '{}'", id, status),
            )),
            None => Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("subscription {} does not exist", id),
            )),
        }
    }

    async fn update_status(
        &self,
        id: SubscriptionId,
        status: SubscriptionStatus,
    ) -> Result<(), DomainError> {
        // Compare-and-swap on the observed status so a concurrent activation
        // cannot be overwritten with an illegal transition. Zero affected
        // rows means the status moved underneath us; re-read and re-check.
        loop {
            let row: Option<(String,)> =
                sqlx::query_as("SELECT status FROM subscriptions WHERE id = $1")
                    .bind(id.as_i64())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| DomainError::database(e.to_string()))?;

            let Some((current,)) = row else {
                return Err(DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    format!("subscription {} does not exist", id),
                ));
            };
            let current = SubscriptionStatus::from_db_str(&current)
                .map_err(|e| DomainError::database(e.to_string()))?;

            if !current.can_transition_to(&status) {
                warn!(
                    subscription_id = id.as_i64(),
                    from = ?current,
                    to = ?status,
                    "ignoring illegal subscription status transition"
                );
                return Ok(());
            }

            let affected = sqlx::query(
                "UPDATE subscriptions SET status = $2 WHERE id = $1 AND status = $3",
            )
            .bind(id.as_i64())
            .bind(status.as_db_str())
            .bind(current.as_db_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .rows_affected();

            if affected > 0 {
                return Ok(());
            }
        }
    }
}
