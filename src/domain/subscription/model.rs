//! Subscription entity and billing period vocabulary.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DonorId, FormId, Money, SubscriptionId, Timestamp, ValidationError,
};

use super::SubscriptionStatus;

/// Billing period unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPeriod {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl SubscriptionPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPeriod::Day => "day",
            SubscriptionPeriod::Week => "week",
            SubscriptionPeriod::Month => "month",
            SubscriptionPeriod::Quarter => "quarter",
            SubscriptionPeriod::Year => "year",
        }
    }

    pub fn from_str_loose(s: &str) -> Result<Self, ValidationError> {
        match s {
            "day" => Ok(SubscriptionPeriod::Day),
            "week" => Ok(SubscriptionPeriod::Week),
            "month" => Ok(SubscriptionPeriod::Month),
            "quarter" => Ok(SubscriptionPeriod::Quarter),
            "year" => Ok(SubscriptionPeriod::Year),
            other => Err(ValidationError::invalid_format(
                "period",
                format!("unknown period '{}'", other),
            )),
        }
    }
}

/// A persisted recurring subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub donor_id: DonorId,
    pub form_id: FormId,
    pub status: SubscriptionStatus,
    pub period: SubscriptionPeriod,

    /// Periods between renewals, e.g. 3 + Month bills quarterly.
    pub frequency: u32,

    /// Total installments; 0 means until cancelled.
    pub installments: u32,

    pub initial_amount: Money,
    pub recurring_amount: Money,
    pub recurring_fee_amount: Money,

    /// The provider's subscription reference.
    pub gateway_subscription_id: Option<String>,

    /// Transaction id of the initial payment.
    pub transaction_id: Option<String>,

    pub created_at: Timestamp,
}

/// Input record for creating a subscription.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub donor_id: DonorId,
    pub form_id: FormId,
    pub period: SubscriptionPeriod,
    pub frequency: u32,
    pub installments: u32,
    pub initial_amount: Money,
    pub recurring_amount: Money,
    pub recurring_fee_amount: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_strings_round_trip() {
        for period in [
            SubscriptionPeriod::Day,
            SubscriptionPeriod::Week,
            SubscriptionPeriod::Month,
            SubscriptionPeriod::Quarter,
            SubscriptionPeriod::Year,
        ] {
            assert_eq!(
                SubscriptionPeriod::from_str_loose(period.as_str()).unwrap(),
                period
            );
        }
        assert!(SubscriptionPeriod::from_str_loose("fortnight").is_err());
    }
}
