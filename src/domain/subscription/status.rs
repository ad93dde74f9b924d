//! Subscription status lattice.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a recurring subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Created, awaiting the gateway's confirmation.
    Pending,

    /// Confirmed by the gateway, renewals expected.
    Active,

    /// Installment limit reached.
    Completed,

    /// Renewal payments failing at the gateway.
    Failing,

    /// Stopped by donor or admin.
    Cancelled,

    /// Gateway stopped billing without cancellation.
    Suspended,

    /// Ran past its end date.
    Expired,

    /// Refunded in full.
    Refunded,
}

impl SubscriptionStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Completed => "completed",
            SubscriptionStatus::Failing => "failing",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Suspended => "suspended",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Refunded => "refunded",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, ValidationError> {
        match s {
            "pending" => Ok(SubscriptionStatus::Pending),
            "active" => Ok(SubscriptionStatus::Active),
            "completed" => Ok(SubscriptionStatus::Completed),
            "failing" => Ok(SubscriptionStatus::Failing),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            "suspended" => Ok(SubscriptionStatus::Suspended),
            "expired" => Ok(SubscriptionStatus::Expired),
            "refunded" => Ok(SubscriptionStatus::Refunded),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown subscription status '{}'", other),
            )),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            (Pending, Active)
                | (Pending, Cancelled)
                | (Pending, Failing)
                | (Active, Completed)
                | (Active, Failing)
                | (Active, Cancelled)
                | (Active, Suspended)
                | (Active, Expired)
                | (Active, Refunded)
                | (Failing, Active)
                | (Failing, Cancelled)
                | (Suspended, Active)
                | (Suspended, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Pending => vec![Active, Cancelled, Failing],
            Active => vec![Completed, Failing, Cancelled, Suspended, Expired, Refunded],
            Failing => vec![Active, Cancelled],
            Suspended => vec![Active, Cancelled],
            Completed | Cancelled | Expired | Refunded => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_activates() {
        assert_eq!(
            SubscriptionStatus::Pending.transition_to(SubscriptionStatus::Active),
            Ok(SubscriptionStatus::Active)
        );
    }

    #[test]
    fn failing_can_recover() {
        assert!(SubscriptionStatus::Failing.can_transition_to(&SubscriptionStatus::Active));
    }

    #[test]
    fn cancelled_is_terminal() {
        assert!(SubscriptionStatus::Cancelled.is_terminal());
    }

    #[test]
    fn db_strings_round_trip() {
        for status in [
            SubscriptionStatus::Pending,
            SubscriptionStatus::Active,
            SubscriptionStatus::Completed,
            SubscriptionStatus::Failing,
            SubscriptionStatus::Cancelled,
            SubscriptionStatus::Suspended,
            SubscriptionStatus::Expired,
            SubscriptionStatus::Refunded,
        ] {
            assert_eq!(
                SubscriptionStatus::from_db_str(status.as_db_str()).unwrap(),
                status
            );
        }
    }
}
