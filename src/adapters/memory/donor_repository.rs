//! In-memory donor repository.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, DonorId, Timestamp};
use crate::ports::{Donor, DonorRepository};

pub struct InMemoryDonorRepository {
    donors: Mutex<HashMap<i64, Donor>>,
    next_id: AtomicI64,
}

impl InMemoryDonorRepository {
    pub fn new() -> Self {
        Self {
            donors: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Seeds a donor and returns it.
    pub fn add_donor(
        &self,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Donor {
        let donor = Donor {
            id: DonorId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            created_at: Timestamp::now(),
        };
        self.donors
            .lock()
            .expect("InMemoryDonorRepository: lock poisoned")
            .insert(donor.id.as_i64(), donor.clone());
        donor
    }
}

impl Default for InMemoryDonorRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DonorRepository for InMemoryDonorRepository {
    async fn get_by_id(&self, id: DonorId) -> Result<Option<Donor>, DomainError> {
        Ok(self
            .donors
            .lock()
            .expect("InMemoryDonorRepository: lock poisoned")
            .get(&id.as_i64())
            .cloned())
    }
}
