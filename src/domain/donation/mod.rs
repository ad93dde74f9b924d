//! Donation module - The donation entity, its status lattice, and lifecycle
//! event vocabulary.

pub mod events;
mod model;
mod purchase_key;
mod status;

pub use model::{BillingAddress, Donation, DonationMode, NewDonation};
pub use purchase_key::generate_purchase_key;
pub use status::DonationStatus;
