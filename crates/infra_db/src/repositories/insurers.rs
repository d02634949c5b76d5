//! Insurer repository implementation

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const INSURER_COLUMNS: &str = "id, name, code, email, date_preference, specialty_preferences, \
     min_batch_size, max_batch_size, daily_capacity";

/// Repository for insurers and their batching policy
#[derive(Debug, Clone)]
pub struct InsurerRepository {
    pool: PgPool,
}

impl InsurerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, insurer_id: Uuid) -> Result<InsurerRow, DatabaseError> {
        let sql = format!("SELECT {} FROM insurers WHERE id = $1", INSURER_COLUMNS);
        sqlx::query_as::<_, InsurerRow>(&sql)
            .bind(insurer_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Insurer", insurer_id))
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<InsurerRow>, DatabaseError> {
        let sql = format!("SELECT {} FROM insurers WHERE code = $1", INSURER_COLUMNS);
        let row = sqlx::query_as::<_, InsurerRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn list(&self) -> Result<Vec<InsurerRow>, DatabaseError> {
        let sql = format!("SELECT {} FROM insurers ORDER BY code", INSURER_COLUMNS);
        let rows = sqlx::query_as::<_, InsurerRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Inserts an insurer or replaces the policy of the one with the same id
    pub async fn upsert(&self, insurer: &InsurerRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO insurers (
                id, name, code, email, date_preference, specialty_preferences,
                min_batch_size, max_batch_size, daily_capacity
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                code = EXCLUDED.code,
                email = EXCLUDED.email,
                date_preference = EXCLUDED.date_preference,
                specialty_preferences = EXCLUDED.specialty_preferences,
                min_batch_size = EXCLUDED.min_batch_size,
                max_batch_size = EXCLUDED.max_batch_size,
                daily_capacity = EXCLUDED.daily_capacity
            "#,
        )
        .bind(insurer.id)
        .bind(&insurer.name)
        .bind(&insurer.code)
        .bind(&insurer.email)
        .bind(&insurer.date_preference)
        .bind(&insurer.specialty_preferences)
        .bind(insurer.min_batch_size)
        .bind(insurer.max_batch_size)
        .bind(insurer.daily_capacity)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Deletes an insurer; claims and batches referencing it block the delete
    pub async fn delete(&self, insurer_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM insurers WHERE id = $1")
            .bind(insurer_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Insurer", insurer_id));
        }
        Ok(())
    }
}

/// Database row for insurer
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InsurerRow {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub email: Option<String>,
    pub date_preference: String,
    pub specialty_preferences: Json<BTreeMap<String, Decimal>>,
    pub min_batch_size: i32,
    pub max_batch_size: i32,
    pub daily_capacity: i32,
}
