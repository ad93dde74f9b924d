//! Donation entity and the new-donation input record.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DonationId, DonorId, FormId, Money, SubscriptionId, Timestamp, ValidationError,
};

use super::DonationStatus;

/// Live vs test gateway traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationMode {
    Live,
    Test,
}

impl DonationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationMode::Live => "live",
            DonationMode::Test => "test",
        }
    }

    pub fn from_str_loose(s: &str) -> Result<Self, ValidationError> {
        match s {
            "live" => Ok(DonationMode::Live),
            "test" => Ok(DonationMode::Test),
            other => Err(ValidationError::invalid_format(
                "mode",
                format!("unknown mode '{}'", other),
            )),
        }
    }
}

/// Optional billing address captured with a donation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAddress {
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip: Option<String>,
}

impl BillingAddress {
    /// True when no component is set.
    pub fn is_empty(&self) -> bool {
        self.address1.is_none()
            && self.address2.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.country.is_none()
            && self.zip.is_none()
    }
}

/// A persisted donation.
///
/// The repository is the only writer; handlers receive a `Donation`, mutate
/// fields, and hand it back to `update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub id: DonationId,
    pub status: DonationStatus,
    pub amount: Money,
    pub gateway_id: String,
    pub donor_id: DonorId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub form_id: FormId,
    pub mode: DonationMode,

    /// Opaque key printed on receipts and used in gateway return URLs.
    pub purchase_key: String,

    /// Donor IP captured at submission time.
    pub donor_ip: String,

    /// Gateway-side transaction reference, set once the gateway reports one.
    pub gateway_transaction_id: Option<String>,

    /// Parent subscription when this donation is an installment.
    pub subscription_id: Option<SubscriptionId>,

    /// For renewals, the subscription's initial donation.
    pub parent_id: Option<DonationId>,

    pub billing_address: BillingAddress,
    pub anonymous: bool,
    pub level_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Donation {
    /// True when this donation belongs to a subscription.
    pub fn is_recurring(&self) -> bool {
        self.subscription_id.is_some()
    }
}

/// Input record for creating a donation.
///
/// Required properties are optional at the type level so the repository can
/// report exactly which field is missing, matching the pre-transaction
/// validation contract.
#[derive(Debug, Clone, Default)]
pub struct NewDonation {
    pub status: Option<DonationStatus>,
    pub amount: Option<Money>,
    pub gateway_id: Option<String>,
    pub donor_id: Option<DonorId>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub form_id: Option<FormId>,

    // Optional properties; the repository fills defaults for absent ones.
    pub mode: Option<DonationMode>,
    pub purchase_key: Option<String>,
    pub donor_ip: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub subscription_id: Option<SubscriptionId>,
    pub parent_id: Option<DonationId>,
    pub billing_address: BillingAddress,
    pub anonymous: bool,
    pub level_id: Option<String>,
    pub created_at: Option<Timestamp>,
}

impl NewDonation {
    /// Checks that every required property is present.
    ///
    /// Runs before any transaction opens; the first missing field aborts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.status.is_none() {
            return Err(ValidationError::missing("status"));
        }
        if self.amount.is_none() {
            return Err(ValidationError::missing("amount"));
        }
        match &self.gateway_id {
            Some(id) if !id.is_empty() => {}
            _ => return Err(ValidationError::missing("gateway_id")),
        }
        if self.donor_id.is_none() {
            return Err(ValidationError::missing("donor_id"));
        }
        match &self.first_name {
            Some(name) if !name.is_empty() => {}
            _ => return Err(ValidationError::missing("first_name")),
        }
        if self.last_name.is_none() {
            return Err(ValidationError::missing("last_name"));
        }
        match &self.email {
            Some(email) if !email.is_empty() => {}
            _ => return Err(ValidationError::missing("email")),
        }
        if self.form_id.is_none() {
            return Err(ValidationError::missing("form_id"));
        }
        Ok(())
    }
}
