//! Donation lifecycle event names.
//!
//! Repositories publish the `*ING` form before the write and the past-tense
//! form after the transaction commits. `PAYMENT_COMPLETED` fires exactly once
//! per donation, when the completion update first applies.

pub const DONATION_CREATING: &str = "donation.creating";
pub const DONATION_CREATED: &str = "donation.created";
pub const DONATION_UPDATING: &str = "donation.updating";
pub const DONATION_UPDATED: &str = "donation.updated";
pub const DONATION_DELETING: &str = "donation.deleting";
pub const DONATION_DELETED: &str = "donation.deleted";
pub const DONATION_PAYMENT_COMPLETED: &str = "donation.payment_completed";

/// Aggregate type string used in event envelopes.
pub const DONATION_AGGREGATE: &str = "Donation";
