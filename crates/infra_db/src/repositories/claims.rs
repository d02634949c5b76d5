//! Claims repository implementation
//!
//! Claims are written once, together with their items, and read back either
//! individually or as the unbatched candidates of an insurer.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const CLAIM_COLUMNS: &str = "c.id, c.provider_id, c.insurer_id, c.encounter_date, c.submission_date, \
     c.specialty, c.priority_level, c.total_amount, c.currency, c.created_at";

/// Which claim date a candidate query filters on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateColumn {
    Encounter,
    Submission,
}

impl DateColumn {
    fn column(self) -> &'static str {
        match self {
            DateColumn::Encounter => "c.encounter_date",
            DateColumn::Submission => "c.submission_date",
        }
    }
}

/// Repository for claims and their items
#[derive(Debug, Clone)]
pub struct ClaimRepository {
    pool: PgPool,
}

impl ClaimRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Retrieves a claim and its items
    pub async fn get_by_id(&self, claim_id: Uuid) -> Result<ClaimWithItems, DatabaseError> {
        let sql = format!("SELECT {} FROM claims c WHERE c.id = $1", CLAIM_COLUMNS);
        let claim = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(claim_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Claim", claim_id))?;

        let mut items = self.items_for(&[claim.id]).await?;
        Ok(ClaimWithItems {
            items: items.remove(&claim.id).unwrap_or_default(),
            claim,
        })
    }

    /// Inserts a claim and its items in one transaction
    pub async fn insert(&self, claim: NewClaim, items: Vec<NewClaimItem>) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO claims (
                id, provider_id, insurer_id, encounter_date, submission_date,
                specialty, priority_level, total_amount, currency, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(claim.id)
        .bind(claim.provider_id)
        .bind(claim.insurer_id)
        .bind(claim.encounter_date)
        .bind(claim.submission_date)
        .bind(&claim.specialty)
        .bind(claim.priority_level)
        .bind(claim.total_amount)
        .bind(&claim.currency)
        .bind(claim.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, item) in items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO claim_items (id, claim_id, name, unit_price, quantity, subtotal, position)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id)
            .bind(claim.id)
            .bind(&item.name)
            .bind(item.unit_price)
            .bind(item.quantity)
            .bind(item.subtotal)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Unbatched claims of an insurer whose `date_column` equals `date`
    ///
    /// Ordered by priority_level ascending, total_amount descending, then id.
    pub async fn find_unbatched_for_date(
        &self,
        insurer_id: Uuid,
        date_column: DateColumn,
        date: NaiveDate,
    ) -> Result<Vec<ClaimWithItems>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM claims c
            WHERE c.insurer_id = $1
              AND {} = $2
              AND NOT EXISTS (SELECT 1 FROM batch_claim bc WHERE bc.claim_id = c.id)
            ORDER BY c.priority_level ASC, c.total_amount DESC, c.id ASC
            "#,
            CLAIM_COLUMNS,
            date_column.column()
        );
        let rows = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(insurer_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        self.with_items(rows).await
    }

    /// All unbatched claims of an insurer, by id
    pub async fn find_unbatched(&self, insurer_id: Uuid) -> Result<Vec<ClaimWithItems>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM claims c
            WHERE c.insurer_id = $1
              AND NOT EXISTS (SELECT 1 FROM batch_claim bc WHERE bc.claim_id = c.id)
            ORDER BY c.id
            "#,
            CLAIM_COLUMNS
        );
        let rows = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(insurer_id)
            .fetch_all(&self.pool)
            .await?;
        self.with_items(rows).await
    }

    /// Every claim of an insurer, by id
    pub async fn find_by_insurer(&self, insurer_id: Uuid) -> Result<Vec<ClaimWithItems>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM claims c WHERE c.insurer_id = $1 ORDER BY c.id",
            CLAIM_COLUMNS
        );
        let rows = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(insurer_id)
            .fetch_all(&self.pool)
            .await?;
        self.with_items(rows).await
    }

    async fn with_items(&self, rows: Vec<ClaimRow>) -> Result<Vec<ClaimWithItems>, DatabaseError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|claim| ClaimWithItems {
                items: items.remove(&claim.id).unwrap_or_default(),
                claim,
            })
            .collect())
    }

    async fn items_for(&self, claim_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<ClaimItemRow>>, DatabaseError> {
        if claim_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, ClaimItemRow>(
            r#"
            SELECT id, claim_id, name, unit_price, quantity, subtotal
            FROM claim_items
            WHERE claim_id = ANY($1)
            ORDER BY claim_id, position
            "#,
        )
        .bind(claim_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_claim: HashMap<Uuid, Vec<ClaimItemRow>> = HashMap::new();
        for row in rows {
            by_claim.entry(row.claim_id).or_default().push(row);
        }
        Ok(by_claim)
    }
}

// Row types

/// Database row for claim
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimRow {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub insurer_id: Uuid,
    pub encounter_date: NaiveDate,
    pub submission_date: NaiveDate,
    pub specialty: String,
    pub priority_level: i16,
    pub total_amount: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Database row for claim item
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimItemRow {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

/// A claim row with its items in entry order
#[derive(Debug, Clone)]
pub struct ClaimWithItems {
    pub claim: ClaimRow,
    pub items: Vec<ClaimItemRow>,
}

/// Data for inserting a claim
#[derive(Debug, Clone)]
pub struct NewClaim {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub insurer_id: Uuid,
    pub encounter_date: NaiveDate,
    pub submission_date: NaiveDate,
    pub specialty: String,
    pub priority_level: i16,
    pub total_amount: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Data for inserting a claim item
#[derive(Debug, Clone)]
pub struct NewClaimItem {
    pub id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}
