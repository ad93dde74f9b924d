//! Data handed to gateway adapters when initiating a payment.

use crate::domain::donation::{BillingAddress, Donation};
use crate::domain::foundation::Money;
use crate::domain::subscription::{Subscription, SubscriptionPeriod};

/// Everything an adapter may need to initiate a one-time payment.
///
/// Built by the orchestrator after the pending donation is persisted, so the
/// adapter always has a real donation id to reference in return URLs.
#[derive(Debug, Clone)]
pub struct GatewayPaymentData {
    pub donation: Donation,
    pub amount: Money,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub billing_address: BillingAddress,

    /// Where to land the donor after a successful payment.
    pub success_url: String,

    /// Where to land the donor after a failed or cancelled payment.
    pub failed_url: String,
}

impl GatewayPaymentData {
    pub fn from_donation(donation: Donation, success_url: String, failed_url: String) -> Self {
        Self {
            amount: donation.amount.clone(),
            first_name: donation.first_name.clone(),
            last_name: donation.last_name.clone(),
            email: donation.email.clone(),
            billing_address: donation.billing_address.clone(),
            donation,
            success_url,
            failed_url,
        }
    }
}

/// Recurring terms handed to adapters that support subscriptions.
#[derive(Debug, Clone)]
pub struct GatewaySubscriptionData {
    pub subscription: Subscription,
    pub period: SubscriptionPeriod,
    pub frequency: u32,
    pub installments: u32,
    pub recurring_amount: Money,
}

impl GatewaySubscriptionData {
    pub fn from_subscription(subscription: Subscription) -> Self {
        Self {
            period: subscription.period,
            frequency: subscription.frequency,
            installments: subscription.installments,
            recurring_amount: subscription.recurring_amount.clone(),
            subscription,
        }
    }
}
