//! GiveHarbor - Donation processing core.
//!
//! Processes donations through pluggable payment gateway adapters, persisting
//! the resulting financial records atomically and protecting gateway callback
//! routes with signed URLs.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
