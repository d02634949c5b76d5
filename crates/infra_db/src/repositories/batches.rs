//! Batch repository implementation
//!
//! [`BatchRepository::commit`] is the only writer of batch membership. Each
//! call is one transaction holding a transaction-scoped advisory lock on the
//! (insurer, batch_date) pair, so the capacity it counts cannot change under
//! it.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::DatabaseError;

const BATCH_COLUMNS: &str =
    "id, insurer_id, provider_id, batch_date, total_cost, currency, created_at, updated_at";

/// Repository for batches and their memberships
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: PgPool,
}

impl BatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, batch_id: Uuid) -> Result<BatchWithClaims, DatabaseError> {
        let sql = format!("SELECT {} FROM batches WHERE id = $1", BATCH_COLUMNS);
        let row = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(batch_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Batch", batch_id))?;
        let mut members = self.members_for(&[row.id]).await?;
        Ok(BatchWithClaims {
            claim_ids: members.remove(&row.id).unwrap_or_default(),
            batch: row,
        })
    }

    pub async fn find_by_key(
        &self,
        insurer_id: Uuid,
        provider_id: Uuid,
        batch_date: NaiveDate,
    ) -> Result<Option<BatchWithClaims>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM batches WHERE insurer_id = $1 AND provider_id = $2 AND batch_date = $3",
            BATCH_COLUMNS
        );
        let Some(row) = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(insurer_id)
            .bind(provider_id)
            .bind(batch_date)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        let mut members = self.members_for(&[row.id]).await?;
        Ok(Some(BatchWithClaims {
            claim_ids: members.remove(&row.id).unwrap_or_default(),
            batch: row,
        }))
    }

    /// Batches of an insurer, newest batch_date first
    pub async fn find_by_insurer(&self, insurer_id: Uuid) -> Result<Vec<BatchWithClaims>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM batches WHERE insurer_id = $1 ORDER BY batch_date DESC, id",
            BATCH_COLUMNS
        );
        let rows = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(insurer_id)
            .fetch_all(&self.pool)
            .await?;
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut members = self.members_for(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|batch| BatchWithClaims {
                claim_ids: members.remove(&batch.id).unwrap_or_default(),
                batch,
            })
            .collect())
    }

    pub async fn batch_of_claim(&self, claim_id: Uuid) -> Result<Option<Uuid>, DatabaseError> {
        let batch_id = sqlx::query_scalar::<_, Uuid>("SELECT batch_id FROM batch_claim WHERE claim_id = $1")
            .bind(claim_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(batch_id)
    }

    pub async fn attached_count(&self, insurer_id: Uuid, batch_date: NaiveDate) -> Result<i64, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        attached_count(&mut conn, insurer_id, batch_date).await
    }

    /// Attaches claims to the batch of a key as one locked transaction
    ///
    /// Claims already in any batch are dropped, then the list is cut to the
    /// capacity left for the (insurer, batch_date) and to the room left in
    /// the batch, where those limits are given. When nothing is attached the
    /// transaction is rolled back, so no empty batch is left behind.
    pub async fn commit(&self, mut write: NewBatchWrite) -> Result<CommitRows, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("{}:{}", write.insurer_id, write.batch_date))
            .execute(&mut *tx)
            .await?;

        let ids: Vec<Uuid> = write.entries.iter().map(|e| e.claim_id).collect();
        let batched: HashSet<Uuid> =
            sqlx::query_scalar::<_, Uuid>("SELECT claim_id FROM batch_claim WHERE claim_id = ANY($1)")
                .bind(&ids)
                .fetch_all(&mut *tx)
                .await?
                .into_iter()
                .collect();
        let mut entries: Vec<NewBatchEntry> = std::mem::take(&mut write.entries)
            .into_iter()
            .filter(|e| !batched.contains(&e.claim_id))
            .collect();

        if let Some(capacity) = write.daily_capacity {
            let used = attached_count(&mut tx, write.insurer_id, write.batch_date).await?;
            entries.truncate(usize::try_from((capacity - used).max(0)).unwrap_or(0));
        }

        if entries.is_empty() {
            let existing = find_for_update(&mut tx, &write).await?;
            let batch = match existing {
                Some(row) => Some(load_members(&mut tx, row).await?),
                None => None,
            };
            tx.commit().await?;
            return Ok(CommitRows { batch, attached: Vec::new() });
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO batches (id, insurer_id, provider_id, batch_date, total_cost, currency, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 0, $5, $6, $6)
            ON CONFLICT (insurer_id, provider_id, batch_date) DO NOTHING
            "#,
        )
        .bind(write.new_batch_id)
        .bind(write.insurer_id)
        .bind(write.provider_id)
        .bind(write.batch_date)
        .bind(&write.currency)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let batch = find_for_update(&mut tx, &write)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Batch", write.new_batch_id))?;
        let existing_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM batch_claim WHERE batch_id = $1")
            .bind(batch.id)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(max) = write.max_batch_size {
            entries.truncate(usize::try_from((max - existing_count).max(0)).unwrap_or(0));
        }

        let mut attached = Vec::with_capacity(entries.len());
        let mut added = Decimal::ZERO;
        for entry in entries {
            let position = existing_count + attached.len() as i64;
            let result = sqlx::query(
                r#"
                INSERT INTO batch_claim (batch_id, claim_id, position, attached_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(batch.id)
            .bind(entry.claim_id)
            .bind(position as i32)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 1 {
                attached.push(entry.claim_id);
                added += entry.amount;
            }
        }

        if attached.is_empty() {
            tx.rollback().await?;
            debug!(batch_id = %batch.id, "Nothing attached, batch write rolled back");
            let existing = self
                .find_by_key(write.insurer_id, write.provider_id, write.batch_date)
                .await?;
            return Ok(CommitRows { batch: existing, attached });
        }

        sqlx::query(
            "UPDATE batches SET total_cost = total_cost + $2, updated_at = $3 WHERE id = $1",
        )
        .bind(batch.id)
        .bind(added)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let batch = find_for_update(&mut tx, &write)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Batch", write.new_batch_id))?;
        let batch = load_members(&mut tx, batch).await?;
        tx.commit().await?;

        Ok(CommitRows {
            batch: Some(batch),
            attached,
        })
    }

    async fn members_for(&self, batch_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Uuid>>, DatabaseError> {
        if batch_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT batch_id, claim_id FROM batch_claim WHERE batch_id = ANY($1) ORDER BY batch_id, position",
        )
        .bind(batch_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut members: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (batch_id, claim_id) in rows {
            members.entry(batch_id).or_default().push(claim_id);
        }
        Ok(members)
    }
}

async fn attached_count(
    conn: &mut sqlx::PgConnection,
    insurer_id: Uuid,
    batch_date: NaiveDate,
) -> Result<i64, DatabaseError> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM batch_claim bc
        JOIN batches b ON b.id = bc.batch_id
        WHERE b.insurer_id = $1 AND b.batch_date = $2
        "#,
    )
    .bind(insurer_id)
    .bind(batch_date)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

async fn find_for_update(
    tx: &mut Transaction<'_, Postgres>,
    write: &NewBatchWrite,
) -> Result<Option<BatchRow>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM batches WHERE insurer_id = $1 AND provider_id = $2 AND batch_date = $3 FOR UPDATE",
        BATCH_COLUMNS
    );
    let row = sqlx::query_as::<_, BatchRow>(&sql)
        .bind(write.insurer_id)
        .bind(write.provider_id)
        .bind(write.batch_date)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row)
}

async fn load_members(
    tx: &mut Transaction<'_, Postgres>,
    batch: BatchRow,
) -> Result<BatchWithClaims, DatabaseError> {
    let claim_ids: Vec<Uuid> =
        sqlx::query_scalar("SELECT claim_id FROM batch_claim WHERE batch_id = $1 ORDER BY position")
            .bind(batch.id)
            .fetch_all(&mut **tx)
            .await?;
    Ok(BatchWithClaims { batch, claim_ids })
}

// Row types

/// Database row for batch
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BatchRow {
    pub id: Uuid,
    pub insurer_id: Uuid,
    pub provider_id: Uuid,
    pub batch_date: NaiveDate,
    pub total_cost: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A batch row with its claim ids in attachment order
#[derive(Debug, Clone)]
pub struct BatchWithClaims {
    pub batch: BatchRow,
    pub claim_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy)]
pub struct NewBatchEntry {
    pub claim_id: Uuid,
    pub amount: Decimal,
}

/// One batch write, keyed by (insurer, provider, batch_date)
#[derive(Debug, Clone)]
pub struct NewBatchWrite {
    /// Used only when the key has no batch yet
    pub new_batch_id: Uuid,
    pub insurer_id: Uuid,
    pub provider_id: Uuid,
    pub batch_date: NaiveDate,
    pub currency: String,
    pub entries: Vec<NewBatchEntry>,
    pub daily_capacity: Option<i64>,
    pub max_batch_size: Option<i64>,
}

/// Outcome of [`BatchRepository::commit`]
#[derive(Debug, Clone)]
pub struct CommitRows {
    pub batch: Option<BatchWithClaims>,
    pub attached: Vec<Uuid>,
}
