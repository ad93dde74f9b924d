//! Donor repository port.
//!
//! Donation inserts validate donor existence against this port before opening
//! a transaction; the donor record itself is owned elsewhere, so the port only
//! exposes what donation processing needs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, DonorId, Timestamp};

/// The donor view donation processing operates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donor {
    pub id: DonorId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: Timestamp,
}

/// Read port for donor records.
#[async_trait]
pub trait DonorRepository: Send + Sync {
    async fn get_by_id(&self, id: DonorId) -> Result<Option<Donor>, DomainError>;

    async fn exists(&self, id: DonorId) -> Result<bool, DomainError> {
        Ok(self.get_by_id(id).await?.is_some())
    }
}
