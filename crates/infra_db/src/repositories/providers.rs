//! Provider repository implementation

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

#[derive(Debug, Clone)]
pub struct ProviderRepository {
    pool: PgPool,
}

impl ProviderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, provider_id: Uuid) -> Result<ProviderRow, DatabaseError> {
        sqlx::query_as::<_, ProviderRow>("SELECT id, name, created_at FROM providers WHERE id = $1")
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Provider", provider_id))
    }

    /// Returns the provider named exactly `name`, inserting `candidate` if none exists
    pub async fn find_or_create(&self, candidate: ProviderRow) -> Result<ProviderRow, DatabaseError> {
        sqlx::query(
            "INSERT INTO providers (id, name, created_at) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING",
        )
        .bind(candidate.id)
        .bind(&candidate.name)
        .bind(candidate.created_at)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, ProviderRow>("SELECT id, name, created_at FROM providers WHERE name = $1")
            .bind(&candidate.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }
}

/// Database row for provider
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProviderRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
