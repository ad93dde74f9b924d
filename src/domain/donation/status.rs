//! Donation status lattice.
//!
//! A donation starts `pending` and moves through the lattice as the gateway
//! reports progress. `Complete` is persisted as the historical string
//! `publish`; every storage backend must keep that mapping.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a single donation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    /// Created, no gateway outcome yet.
    Pending,

    /// Gateway accepted the payment but settlement is outstanding.
    Processing,

    /// Funds captured.
    Complete,

    /// Gateway reported failure.
    Failed,

    /// Donor or gateway cancelled before capture.
    Cancelled,

    /// Donor never returned from an offsite gateway.
    Abandoned,

    /// Captured funds returned to the donor.
    Refunded,

    /// Marker status for subscription renewal installments.
    Renewal,
}

impl DonationStatus {
    /// Returns the persisted string form.
    ///
    /// `Complete` maps to `publish` for compatibility with existing records.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Processing => "processing",
            DonationStatus::Complete => "publish",
            DonationStatus::Failed => "failed",
            DonationStatus::Cancelled => "cancelled",
            DonationStatus::Abandoned => "abandoned",
            DonationStatus::Refunded => "refunded",
            DonationStatus::Renewal => "renewal",
        }
    }

    /// Parses the persisted string form.
    pub fn from_db_str(s: &str) -> Result<Self, ValidationError> {
        match s {
            "pending" => Ok(DonationStatus::Pending),
            "processing" => Ok(DonationStatus::Processing),
            "publish" => Ok(DonationStatus::Complete),
            "failed" => Ok(DonationStatus::Failed),
            "cancelled" => Ok(DonationStatus::Cancelled),
            "abandoned" => Ok(DonationStatus::Abandoned),
            "refunded" => Ok(DonationStatus::Refunded),
            "renewal" => Ok(DonationStatus::Renewal),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown donation status '{}'", other),
            )),
        }
    }

    /// True once funds have been captured.
    pub fn is_complete(&self) -> bool {
        matches!(self, DonationStatus::Complete)
    }
}

impl StateMachine for DonationStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use DonationStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Processing)
                | (Pending, Complete) // direct capture
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Pending, Abandoned)
            // From PROCESSING
                | (Processing, Complete)
                | (Processing, Failed)
                | (Processing, Cancelled)
                | (Processing, Abandoned)
            // From COMPLETE
                | (Complete, Refunded)
            // Renewal installments settle and refund like completed donations
                | (Renewal, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use DonationStatus::*;
        match self {
            Pending => vec![Processing, Complete, Failed, Cancelled, Abandoned],
            Processing => vec![Complete, Failed, Cancelled, Abandoned],
            Complete => vec![Refunded],
            Renewal => vec![Refunded],
            Failed | Cancelled | Abandoned | Refunded => vec![],
        }
    }
}
