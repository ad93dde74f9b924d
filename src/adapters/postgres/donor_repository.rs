//! PostgreSQL implementation of DonorRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, DonorId, Timestamp};
use crate::ports::{Donor, DonorRepository};

pub struct PostgresDonorRepository {
    pool: PgPool,
}

impl PostgresDonorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DonorRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl From<DonorRow> for Donor {
    fn from(row: DonorRow) -> Self {
        Donor {
            id: DonorId::new(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

#[async_trait]
impl DonorRepository for PostgresDonorRepository {
    async fn get_by_id(&self, id: DonorId) -> Result<Option<Donor>, DomainError> {
        let row = sqlx::query_as::<_, DonorRow>(
            "SELECT id, first_name, last_name, email, created_at FROM donors WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(e.to_string()))?;

        Ok(row.map(Donor::from))
    }

    async fn exists(&self, id: DonorId) -> Result<bool, DomainError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM donors WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        Ok(row.is_some())
    }
}
