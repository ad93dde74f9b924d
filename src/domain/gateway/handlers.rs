//! Command handlers.
//!
//! One handler per command variant with side effects. Handlers mutate
//! financial state through the repository ports and return the response the
//! transport should emit; they never write to the connection themselves.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::domain::donation::events as donation_events;
use crate::domain::foundation::{DomainError, DonationId, SubscriptionId};
use crate::ports::{
    ActivationOutcome, CompletionOutcome, DonationRepository, EventPublisher,
    SubscriptionRepository,
};

use super::GatewayResponse;

/// Handles `PaymentComplete`: flips the donation to complete exactly once and
/// publishes the payment-completed notification on first application.
pub async fn handle_payment_complete(
    donations: &Arc<dyn DonationRepository>,
    events: &Arc<dyn EventPublisher>,
    donation_id: DonationId,
    transaction_id: &str,
    success_url: &str,
) -> Result<GatewayResponse, DomainError> {
    let outcome = donations.complete_payment(donation_id, transaction_id).await?;

    match outcome {
        CompletionOutcome::Applied => {
            publish_payment_completed(donations, events, donation_id).await;
            info!(
                donation_id = donation_id.as_i64(),
                transaction_id, "donation payment completed"
            );
        }
        CompletionOutcome::AlreadyApplied => {
            info!(
                donation_id = donation_id.as_i64(),
                transaction_id, "duplicate completion signal ignored"
            );
        }
    }

    Ok(GatewayResponse::redirect(success_url))
}

/// Handles `PaymentProcessing`: the gateway accepted the payment but will
/// confirm settlement later.
pub async fn handle_payment_processing(
    donations: &Arc<dyn DonationRepository>,
    donation_id: DonationId,
    transaction_id: &str,
    success_url: &str,
) -> Result<GatewayResponse, DomainError> {
    donations
        .mark_processing(donation_id, Some(transaction_id))
        .await?;
    info!(
        donation_id = donation_id.as_i64(),
        transaction_id, "donation payment processing"
    );
    Ok(GatewayResponse::redirect(success_url))
}

/// Handles `SubscriptionComplete`: activates the subscription, links and
/// completes its initial donation. Safe under duplicate delivery.
pub async fn handle_subscription_complete(
    donations: &Arc<dyn DonationRepository>,
    subscriptions: &Arc<dyn SubscriptionRepository>,
    events: &Arc<dyn EventPublisher>,
    donation_id: DonationId,
    subscription_id: SubscriptionId,
    gateway_subscription_id: &str,
    transaction_id: &str,
    success_url: &str,
) -> Result<GatewayResponse, DomainError> {
    let activation = subscriptions
        .activate(
            subscription_id,
            gateway_subscription_id,
            transaction_id,
            donation_id,
        )
        .await?;

    if activation == ActivationOutcome::Activated {
        donations
            .mark_initial_subscription_donation(donation_id)
            .await?;
        info!(
            subscription_id = subscription_id.as_i64(),
            gateway_subscription_id, "subscription activated"
        );
    }

    if donations.complete_payment(donation_id, transaction_id).await?
        == CompletionOutcome::Applied
    {
        publish_payment_completed(donations, events, donation_id).await;
    }

    Ok(GatewayResponse::redirect(success_url))
}

/// Publishes `donation.payment_completed` with the fresh donation snapshot.
/// The write already committed, so a publish failure is logged, not raised.
async fn publish_payment_completed(
    donations: &Arc<dyn DonationRepository>,
    events: &Arc<dyn EventPublisher>,
    donation_id: DonationId,
) {
    let payload = match donations.get_by_id(donation_id).await {
        Ok(Some(donation)) => json!(donation),
        Ok(None) => json!({ "id": donation_id.as_i64() }),
        Err(err) => {
            tracing::warn!(
                donation_id = donation_id.as_i64(),
                error = %err,
                "could not load donation for payment-completed event"
            );
            json!({ "id": donation_id.as_i64() })
        }
    };

    let envelope = crate::domain::foundation::EventEnvelope::new(
        donation_events::DONATION_PAYMENT_COMPLETED,
        donation_id.as_i64().to_string(),
        donation_events::DONATION_AGGREGATE,
        payload,
    );

    if let Err(err) = events.publish(envelope).await {
        tracing::warn!(
            donation_id = donation_id.as_i64(),
            error = %err,
            "failed publishing payment-completed event"
        );
    }
}
