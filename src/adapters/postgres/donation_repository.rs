//! PostgreSQL implementation of DonationRepository.
//!
//! Storage model: a narrow entity row in `donations` (id, status, parent,
//! timestamps) plus sparse attribute rows in `donation_meta`. Every write is
//! one transaction over both tables; an update deletes the meta set and
//! rewrites it from the given record.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use tracing::{error, warn};

use crate::domain::donation::events as donation_events;
use crate::domain::donation::{
    generate_purchase_key, BillingAddress, Donation, DonationMode, DonationStatus, NewDonation,
};
use crate::domain::foundation::{
    DomainError, DonationId, DonorId, ErrorCode, EventEnvelope, Money, StateMachine,
    SubscriptionId, Timestamp, ValidationError,
};
use crate::ports::{CompletionOutcome, DonationRepository, DonorRepository, EventPublisher};
use std::sync::Arc;

/// Fixed meta key enumeration. Nothing else is ever written to
/// `donation_meta`.
mod meta_keys {
    pub const AMOUNT: &str = "_amount";
    pub const CURRENCY: &str = "_currency";
    pub const GATEWAY: &str = "_gateway";
    pub const DONOR_ID: &str = "_donor_id";
    pub const FIRST_NAME: &str = "_first_name";
    pub const LAST_NAME: &str = "_last_name";
    pub const EMAIL: &str = "_email";
    pub const FORM_ID: &str = "_form_id";
    pub const MODE: &str = "_mode";
    pub const PURCHASE_KEY: &str = "_purchase_key";
    pub const DONOR_IP: &str = "_donor_ip";
    pub const TRANSACTION_ID: &str = "_transaction_id";
    pub const SUBSCRIPTION_ID: &str = "_subscription_id";
    pub const SUBSCRIPTION_PAYMENT: &str = "_subscription_payment";
    pub const ANONYMOUS: &str = "_anonymous";
    pub const LEVEL_ID: &str = "_level_id";
    pub const BILLING_ADDRESS1: &str = "_billing_address1";
    pub const BILLING_ADDRESS2: &str = "_billing_address2";
    pub const BILLING_CITY: &str = "_billing_city";
    pub const BILLING_STATE: &str = "_billing_state";
    pub const BILLING_COUNTRY: &str = "_billing_country";
    pub const BILLING_ZIP: &str = "_billing_zip";
}

pub struct PostgresDonationRepository {
    pool: PgPool,
    donors: Arc<dyn DonorRepository>,
    events: Arc<dyn EventPublisher>,
    default_mode: DonationMode,
}

impl PostgresDonationRepository {
    pub fn new(
        pool: PgPool,
        donors: Arc<dyn DonorRepository>,
        events: Arc<dyn EventPublisher>,
        default_mode: DonationMode,
    ) -> Self {
        Self {
            pool,
            donors,
            events,
            default_mode,
        }
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

    async fn load(&self, id: DonationId) -> Result<Option<Donation>, DomainError> {
        let entity = sqlx::query_as::<_, EntityRow>(
            "SELECT id, status, parent_id, created_at, updated_at FROM donations WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        let Some(entity) = entity else {
            return Ok(None);
        };

        let meta = self.load_meta(id).await?;
        build_donation(entity, meta).map(Some)
    }

    async fn load_meta(&self, id: DonationId) -> Result<HashMap<String, String>, DomainError> {
        let rows = sqlx::query_as::<_, MetaRow>(
            "SELECT meta_key, meta_value FROM donation_meta WHERE donation_id = $1",
        )
        .bind(id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|row| (row.meta_key, row.meta_value))
            .collect())
    }

    async fn write_meta<'t>(
        tx: &mut sqlx::Transaction<'t, sqlx::Postgres>,
        id: DonationId,
        rows: &[(&'static str, String)],
    ) -> Result<(), sqlx::Error> {
        for (key, value) in rows {
            sqlx::query(
                "INSERT INTO donation_meta (donation_id, meta_key, meta_value) VALUES ($1, $2, $3)",
            )
            .bind(id.as_i64())
            .bind(*key)
            .bind(value)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EntityRow {
    id: i64,
    status: String,
    parent_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct MetaRow {
    meta_key: String,
    meta_value: String,
}

fn db_error(err: sqlx::Error) -> DomainError {
    DomainError::database(err.to_string())
}

fn missing_meta(key: &str) -> DomainError {
    DomainError::database(format!("donation meta '{}' missing", key))
}

/// The sparse meta set for a donation: present attributes only.
fn meta_rows_for(donation: &Donation) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        (meta_keys::AMOUNT, donation.amount.amount_minor().to_string()),
        (meta_keys::CURRENCY, donation.amount.currency().to_string()),
        (meta_keys::GATEWAY, donation.gateway_id.clone()),
        (meta_keys::DONOR_ID, donation.donor_id.as_i64().to_string()),
        (meta_keys::FIRST_NAME, donation.first_name.clone()),
        (meta_keys::LAST_NAME, donation.last_name.clone()),
        (meta_keys::EMAIL, donation.email.clone()),
        (meta_keys::FORM_ID, donation.form_id.as_i64().to_string()),
        (meta_keys::MODE, donation.mode.as_str().to_string()),
        (meta_keys::PURCHASE_KEY, donation.purchase_key.clone()),
        (meta_keys::DONOR_IP, donation.donor_ip.clone()),
    ];

    if let Some(tx_id) = &donation.gateway_transaction_id {
        rows.push((meta_keys::TRANSACTION_ID, tx_id.clone()));
    }
    if let Some(subscription_id) = donation.subscription_id {
        rows.push((meta_keys::SUBSCRIPTION_ID, subscription_id.as_i64().to_string()));
    }
    if donation.anonymous {
        rows.push((meta_keys::ANONYMOUS, "1".to_string()));
    }
    if let Some(level_id) = &donation.level_id {
        rows.push((meta_keys::LEVEL_ID, level_id.clone()));
    }

    let address = &donation.billing_address;
    for (key, value) in [
        (meta_keys::BILLING_ADDRESS1, &address.address1),
        (meta_keys::BILLING_ADDRESS2, &address.address2),
        (meta_keys::BILLING_CITY, &address.city),
        (meta_keys::BILLING_STATE, &address.state),
        (meta_keys::BILLING_COUNTRY, &address.country),
        (meta_keys::BILLING_ZIP, &address.zip),
    ] {
        if let Some(value) = value {
            rows.push((key, value.clone()));
        }
    }

    rows
}

fn build_donation(
    entity: EntityRow,
    meta: HashMap<String, String>,
) -> Result<Donation, DomainError> {
    let get = |key: &str| meta.get(key).cloned().ok_or_else(|| missing_meta(key));

    let amount_minor: i64 = get(meta_keys::AMOUNT)?
        .parse()
        .map_err(|_| DomainError::database("malformed '_amount' meta"))?;
    let amount = Money::new(amount_minor, &get(meta_keys::CURRENCY)?)
        .map_err(|e| DomainError::database(e.to_string()))?;

    let parse_i64 = |key: &str, raw: String| {
        raw.parse::<i64>()
            .map_err(|_| DomainError::database(format!("malformed '{}' meta", key)))
    };

    Ok(Donation {
        id: DonationId::new(entity.id),
        status: DonationStatus::from_db_str(&entity.status)
            .map_err(|e| DomainError::database(e.to_string()))?,
        amount,
        gateway_id: get(meta_keys::GATEWAY)?,
        donor_id: DonorId::new(parse_i64(meta_keys::DONOR_ID, get(meta_keys::DONOR_ID)?)?),
        first_name: get(meta_keys::FIRST_NAME)?,
        last_name: get(meta_keys::LAST_NAME)?,
        email: get(meta_keys::EMAIL)?,
        form_id: crate::domain::foundation::FormId::new(parse_i64(
            meta_keys::FORM_ID,
            get(meta_keys::FORM_ID)?,
        )?),
        mode: DonationMode::from_str_loose(&get(meta_keys::MODE)?)
            .map_err(|e| DomainError::database(e.to_string()))?,
        purchase_key: get(meta_keys::PURCHASE_KEY)?,
        donor_ip: get(meta_keys::DONOR_IP)?,
        gateway_transaction_id: meta.get(meta_keys::TRANSACTION_ID).cloned(),
        subscription_id: meta
            .get(meta_keys::SUBSCRIPTION_ID)
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(SubscriptionId::new),
        parent_id: entity.parent_id.map(DonationId::new),
        billing_address: BillingAddress {
            address1: meta.get(meta_keys::BILLING_ADDRESS1).cloned(),
            address2: meta.get(meta_keys::BILLING_ADDRESS2).cloned(),
            city: meta.get(meta_keys::BILLING_CITY).cloned(),
            state: meta.get(meta_keys::BILLING_STATE).cloned(),
            country: meta.get(meta_keys::BILLING_COUNTRY).cloned(),
            zip: meta.get(meta_keys::BILLING_ZIP).cloned(),
        },
        anonymous: meta.get(meta_keys::ANONYMOUS).map(String::as_str) == Some("1"),
        level_id: meta.get(meta_keys::LEVEL_ID).cloned(),
        created_at: Timestamp::from_datetime(entity.created_at),
        updated_at: Timestamp::from_datetime(entity.updated_at),
    })
}

#[async_trait]
impl DonationRepository for PostgresDonationRepository {
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

        let now = Timestamp::now();
        let status = new_donation.status.unwrap_or(DonationStatus::Pending);
        let created_at = new_donation.created_at.unwrap_or(now);

        // validate() checked presence of the required fields.
        let donation = Donation {
            id: DonationId::new(0), // assigned below
            status,
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
            created_at,
            updated_at: now,
        };

        self.publish_lifecycle(donation_events::DONATION_CREATING, &donation)
            .await;

        let result: Result<DonationId, sqlx::Error> = async {
            let mut tx = self.pool.begin().await?;

            let (id,): (i64,) = sqlx::query_as(
                "INSERT INTO donations (status, parent_id, created_at, updated_at)
                 VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .bind(donation.status.as_db_str())
            .bind(donation.parent_id.map(|p| p.as_i64()))
            .bind(donation.created_at.as_datetime())
            .bind(donation.updated_at.as_datetime())
            .fetch_one(&mut *tx)
            .await?;

            let id = DonationId::new(id);
            Self::write_meta(&mut tx, id, &meta_rows_for(&donation)).await?;

            tx.commit().await?;
            Ok(id)
        }
        .await;

        // Transaction rolls back on drop if anything above failed.
        let id = match result {
            Ok(id) => id,
            Err(err) => {
                error!(payload = ?donation, error = %err, "failed creating donation, rolled back");
                return Err(DomainError::persistence("Failed creating a donation"));
            }
        };

        // Re-read what actually committed so the caller never sees a record
        // that drifted from the database (column defaults, truncation).
        let stored = self.load(id).await?.ok_or_else(|| {
            DomainError::database(format!("donation {} missing after insert", id))
        })?;

        self.publish_lifecycle(donation_events::DONATION_CREATED, &stored)
            .await;

        Ok(stored)
    }

    async fn update(&self, donation: &Donation) -> Result<Donation, DomainError> {
        self.publish_lifecycle(donation_events::DONATION_UPDATING, donation)
            .await;

        let mut updated = donation.clone();
        updated.updated_at = Timestamp::now();

        let result: Result<bool, sqlx::Error> = async {
            let mut tx = self.pool.begin().await?;

            let affected = sqlx::query(
                "UPDATE donations SET status = $2, parent_id = $3, updated_at = $4 WHERE id = $1",
            )
            .bind(updated.id.as_i64())
            .bind(updated.status.as_db_str())
            .bind(updated.parent_id.map(|p| p.as_i64()))
            .bind(updated.updated_at.as_datetime())
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if affected == 0 {
                return Ok(false);
            }

            // Whole-record replace: drop the meta set, rewrite the sparse
            // rows from the given record.
            sqlx::query("DELETE FROM donation_meta WHERE donation_id = $1")
                .bind(updated.id.as_i64())
                .execute(&mut *tx)
                .await?;
            Self::write_meta(&mut tx, updated.id, &meta_rows_for(&updated)).await?;

            tx.commit().await?;
            Ok(true)
        }
        .await;

        match result {
            Ok(true) => {}
            Ok(false) => {
                return Err(DomainError::new(
                    ErrorCode::DonationNotFound,
                    format!("donation {} does not exist", donation.id),
                ))
            }
            Err(err) => {
                error!(payload = ?donation, error = %err, "failed updating donation, rolled back");
                return Err(DomainError::persistence("Failed updating a donation"));
            }
        }

        self.publish_lifecycle(donation_events::DONATION_UPDATED, &updated)
            .await;

        Ok(updated)
    }

    async fn delete(&self, donation: &Donation) -> Result<bool, DomainError> {
        self.publish_lifecycle(donation_events::DONATION_DELETING, donation)
            .await;

        let result: Result<bool, sqlx::Error> = async {
            let mut tx = self.pool.begin().await?;

            sqlx::query("DELETE FROM donation_meta WHERE donation_id = $1")
                .bind(donation.id.as_i64())
                .execute(&mut *tx)
                .await?;
            let affected = sqlx::query("DELETE FROM donations WHERE id = $1")
                .bind(donation.id.as_i64())
                .execute(&mut *tx)
                .await?
                .rows_affected();

            tx.commit().await?;
            Ok(affected > 0)
        }
        .await;

        let removed = match result {
            Ok(removed) => removed,
            Err(err) => {
                error!(donation_id = donation.id.as_i64(), error = %err, "failed deleting donation, rolled back");
                return Err(DomainError::persistence("Failed deleting a donation"));
            }
        };

        if removed {
            self.publish_lifecycle(donation_events::DONATION_DELETED, donation)
                .await;
        }

        Ok(removed)
    }

    async fn get_by_id(&self, id: DonationId) -> Result<Option<Donation>, DomainError> {
        self.load(id).await
    }

    async fn query_by_donor_id(&self, donor_id: DonorId) -> Result<Vec<Donation>, DomainError> {
        let ids = self.donation_ids_by_donor_id(donor_id).await?;
        let mut donations = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(donation) = self.load(id).await? {
                donations.push(donation);
            }
        }
        Ok(donations)
    }

    async fn query_by_subscription_id(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<Vec<Donation>, DomainError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT donation_id FROM donation_meta
             WHERE meta_key = $1 AND meta_value = $2
             ORDER BY donation_id DESC",
        )
        .bind(meta_keys::SUBSCRIPTION_ID)
        .bind(subscription_id.as_i64().to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut donations = Vec::with_capacity(rows.len());
        for (id,) in rows {
            if let Some(donation) = self.load(DonationId::new(id)).await? {
                donations.push(donation);
            }
        }
        Ok(donations)
    }

    async fn complete_payment(
        &self,
        id: DonationId,
        transaction_id: &str,
    ) -> Result<CompletionOutcome, DomainError> {
        // The conditional update is the apply-once guard: only one of two
        // racing signals sees an affected row.
        let result: Result<u64, sqlx::Error> = async {
            let mut tx = self.pool.begin().await?;

            let affected = sqlx::query(
                "UPDATE donations SET status = 'publish', updated_at = $2
                 WHERE id = $1 AND status IN ('pending', 'processing')",
            )
            .bind(id.as_i64())
            .bind(Timestamp::now().as_datetime())
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if affected > 0 {
                sqlx::query("DELETE FROM donation_meta WHERE donation_id = $1 AND meta_key = $2")
                    .bind(id.as_i64())
                    .bind(meta_keys::TRANSACTION_ID)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query(
                    "INSERT INTO donation_meta (donation_id, meta_key, meta_value) VALUES ($1, $2, $3)",
                )
                .bind(id.as_i64())
                .bind(meta_keys::TRANSACTION_ID)
                .bind(transaction_id)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok(affected)
        }
        .await;

        let affected = result.map_err(db_error)?;
        if affected > 0 {
            return Ok(CompletionOutcome::Applied);
        }

        let status: Option<(String,)> =
            sqlx::query_as("SELECT status FROM donations WHERE id = $1")
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        match status {
            Some((status,)) if status == "publish" => Ok(CompletionOutcome::AlreadyApplied),
            Some((status,)) => Err(DomainError::new(
                ErrorCode::ValidationFailed,
                format!("cannot complete donation {} in status '{}'", id, status),
            )),
            None => Err(DomainError::new(
                ErrorCode::DonationNotFound,
                format!("donation {} does not exist", id),
            )),
        }
    }

    async fn mark_processing(
        &self,
        id: DonationId,
        transaction_id: Option<&str>,
    ) -> Result<(), DomainError> {
        let result: Result<(), sqlx::Error> = async {
            let mut tx = self.pool.begin().await?;

            let affected = sqlx::query(
                "UPDATE donations SET status = 'processing', updated_at = $2
                 WHERE id = $1 AND status = 'pending'",
            )
            .bind(id.as_i64())
            .bind(Timestamp::now().as_datetime())
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if affected > 0 {
                if let Some(tx_id) = transaction_id {
                    // The meta key is single-valued; drop any row written at
                    // creation time before the rewrite.
                    sqlx::query(
                        "DELETE FROM donation_meta WHERE donation_id = $1 AND meta_key = $2",
                    )
                    .bind(id.as_i64())
                    .bind(meta_keys::TRANSACTION_ID)
                    .execute(&mut *tx)
                    .await?;
                    sqlx::query(
                        "INSERT INTO donation_meta (donation_id, meta_key, meta_value) VALUES ($1, $2, $3)",
                    )
                    .bind(id.as_i64())
                    .bind(meta_keys::TRANSACTION_ID)
                    .bind(tx_id)
                    .execute(&mut *tx)
                    .await?;
                }
            }

            tx.commit().await?;
            Ok(())
        }
        .await;

        result.map_err(db_error)
    }

    async fn mark_initial_subscription_donation(
        &self,
        id: DonationId,
    ) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO donation_meta (donation_id, meta_key, meta_value)
             SELECT $1, $2, '1'
             WHERE NOT EXISTS (
                 SELECT 1 FROM donation_meta WHERE donation_id = $1 AND meta_key = $2
             )",
        )
        .bind(id.as_i64())
        .bind(meta_keys::SUBSCRIPTION_PAYMENT)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn update_status(
        &self,
        id: DonationId,
        status: DonationStatus,
    ) -> Result<(), DomainError> {
        // Compare-and-swap on the observed status: the lattice check and the
        // write must agree, or a concurrent completion could be overwritten
        // with an illegal transition. Zero affected rows means the status
        // moved underneath us; re-read and re-check.
        loop {
            let row: Option<(String,)> =
                sqlx::query_as("SELECT status FROM donations WHERE id = $1")
                    .bind(id.as_i64())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(db_error)?;

            let Some((current,)) = row else {
                return Err(DomainError::new(
                    ErrorCode::DonationNotFound,
                    format!("donation {} does not exist", id),
                ));
            };
            let current = DonationStatus::from_db_str(&current)
                .map_err(|e| DomainError::database(e.to_string()))?;

            if !current.can_transition_to(&status) {
                warn!(
                    donation_id = id.as_i64(),
                    from = ?current,
                    to = ?status,
                    "ignoring illegal donation status transition"
                );
                return Ok(());
            }

            let affected = sqlx::query(
                "UPDATE donations SET status = $2, updated_at = $3
                 WHERE id = $1 AND status = $4",
            )
            .bind(id.as_i64())
            .bind(status.as_db_str())
            .bind(Timestamp::now().as_datetime())
            .bind(current.as_db_str())
            .execute(&self.pool)
            .await
            .map_err(db_error)?
            .rows_affected();

            if affected > 0 {
                return Ok(());
            }
        }
    }

    async fn count_by_donor_id(&self, donor_id: DonorId) -> Result<u64, DomainError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM donation_meta WHERE meta_key = $1 AND meta_value = $2",
        )
        .bind(meta_keys::DONOR_ID)
        .bind(donor_id.as_i64().to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(count as u64)
    }

    async fn donation_ids_by_donor_id(
        &self,
        donor_id: DonorId,
    ) -> Result<Vec<DonationId>, DomainError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT donation_id FROM donation_meta
             WHERE meta_key = $1 AND meta_value = $2
             ORDER BY donation_id DESC",
        )
        .bind(meta_keys::DONOR_ID)
        .bind(donor_id.as_i64().to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(|(id,)| DonationId::new(id)).collect())
    }
}
