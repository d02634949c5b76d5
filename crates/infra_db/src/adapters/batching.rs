//! PostgreSQL Batching Adapter
//!
//! Implements the batching store ports on top of the repositories:
//! [`ClaimStore`], [`BatchStore`], [`InsurerStore`] and [`ProviderStore`].
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresBatchingAdapter;
//! use domain_batching::BatchingPorts;
//!
//! let adapter = Arc::new(PostgresBatchingAdapter::new(pool));
//! let ports = BatchingPorts::from_store(adapter, notifier);
//! ```

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, BatchId, ClaimId, ClaimItemId, Currency, DomainPort, HealthCheckResult,
    HealthCheckable, InsurerId, Money, PortError, ProviderId,
};
use domain_batching::{
    BatchCommit, BatchStore, BatchWrite, ClaimStore, InsurerStore, ProviderStore,
};
use domain_claims::{Batch, BatchKey, Claim, ClaimItem, DatePreference, Insurer, Provider};

use crate::error::DatabaseError;
use crate::repositories::batches::{BatchWithClaims, NewBatchEntry, NewBatchWrite};
use crate::repositories::claims::{ClaimWithItems, DateColumn, NewClaim, NewClaimItem};
use crate::repositories::insurers::InsurerRow;
use crate::repositories::providers::ProviderRow;
use crate::repositories::{BatchRepository, ClaimRepository, InsurerRepository, ProviderRepository};

/// PostgreSQL-backed implementation of the batching store ports
///
/// Database errors are translated to `PortError` variants:
/// - `DatabaseError::NotFound` -> `PortError::NotFound`
/// - unique and foreign key violations -> `PortError::Conflict`
/// - connection problems -> `PortError::Connection`
/// - other errors -> `PortError::Internal`
#[derive(Debug, Clone)]
pub struct PostgresBatchingAdapter {
    claims: ClaimRepository,
    batches: BatchRepository,
    insurers: InsurerRepository,
    providers: ProviderRepository,
    pool: PgPool,
}

impl PostgresBatchingAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            claims: ClaimRepository::new(pool.clone()),
            batches: BatchRepository::new(pool.clone()),
            insurers: InsurerRepository::new(pool.clone()),
            providers: ProviderRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresBatchingAdapter {}

#[async_trait]
impl HealthCheckable for PostgresBatchingAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: "postgres-batching-adapter".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: "postgres-batching-adapter".to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl ClaimStore for PostgresBatchingAdapter {
    #[instrument(skip(self), fields(claim_id = %id))]
    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
        let row = self
            .claims
            .get_by_id(*id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        row_to_claim(row)
    }

    #[instrument(skip(self, claim), fields(claim_id = %claim.id, insurer_id = %claim.insurer_id))]
    async fn insert_claim(&self, claim: &Claim) -> Result<(), PortError> {
        let (row, items) = claim_to_rows(claim);
        self.claims.insert(row, items).await.map_err(db_to_port_error)?;
        debug!("Claim stored");
        Ok(())
    }

    #[instrument(skip(self), fields(insurer_id = %insurer_id))]
    async fn unbatched_claims_for_date(
        &self,
        insurer_id: InsurerId,
        preference: DatePreference,
        date: NaiveDate,
    ) -> Result<Vec<Claim>, PortError> {
        let column = match preference {
            DatePreference::Encounter => DateColumn::Encounter,
            DatePreference::Submission => DateColumn::Submission,
        };
        let rows = self
            .claims
            .find_unbatched_for_date(*insurer_id.as_uuid(), column, date)
            .await
            .map_err(db_to_port_error)?;
        rows.into_iter().map(row_to_claim).collect()
    }

    #[instrument(skip(self), fields(insurer_id = %insurer_id))]
    async fn unbatched_claims(&self, insurer_id: InsurerId) -> Result<Vec<Claim>, PortError> {
        let rows = self
            .claims
            .find_unbatched(*insurer_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        rows.into_iter().map(row_to_claim).collect()
    }

    #[instrument(skip(self), fields(insurer_id = %insurer_id))]
    async fn claims_for_insurer(&self, insurer_id: InsurerId) -> Result<Vec<Claim>, PortError> {
        let rows = self
            .claims
            .find_by_insurer(*insurer_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        rows.into_iter().map(row_to_claim).collect()
    }
}

#[async_trait]
impl BatchStore for PostgresBatchingAdapter {
    #[instrument(skip(self), fields(batch_id = %id))]
    async fn get_batch(&self, id: BatchId) -> Result<Batch, PortError> {
        let row = self
            .batches
            .get_by_id(*id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        row_to_batch(row)
    }

    #[instrument(skip(self), fields(insurer_id = %key.insurer_id, provider_id = %key.provider_id, batch_date = %key.batch_date))]
    async fn find_batch(&self, key: BatchKey) -> Result<Option<Batch>, PortError> {
        self.batches
            .find_by_key(*key.insurer_id.as_uuid(), *key.provider_id.as_uuid(), key.batch_date)
            .await
            .map_err(db_to_port_error)?
            .map(row_to_batch)
            .transpose()
    }

    async fn batch_of_claim(&self, claim_id: ClaimId) -> Result<Option<BatchId>, PortError> {
        let batch_id = self
            .batches
            .batch_of_claim(*claim_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        Ok(batch_id.map(BatchId::from_uuid))
    }

    async fn attached_count(
        &self,
        insurer_id: InsurerId,
        batch_date: NaiveDate,
    ) -> Result<u32, PortError> {
        let count = self
            .batches
            .attached_count(*insurer_id.as_uuid(), batch_date)
            .await
            .map_err(db_to_port_error)?;
        u32::try_from(count).map_err(|_| PortError::internal(format!("attached count {} out of range", count)))
    }

    #[instrument(
        skip(self, write),
        fields(
            insurer_id = %write.key.insurer_id,
            provider_id = %write.key.provider_id,
            batch_date = %write.key.batch_date,
            entries = write.entries.len()
        )
    )]
    async fn commit_batch(&self, write: BatchWrite) -> Result<BatchCommit, PortError> {
        let currency = write
            .entries
            .first()
            .map(|e| e.amount.currency())
            .unwrap_or(Currency::USD);
        let rows = NewBatchWrite {
            new_batch_id: *BatchId::new_v7().as_uuid(),
            insurer_id: *write.key.insurer_id.as_uuid(),
            provider_id: *write.key.provider_id.as_uuid(),
            batch_date: write.key.batch_date,
            currency: currency.code().to_string(),
            entries: write
                .entries
                .iter()
                .map(|e| NewBatchEntry {
                    claim_id: *e.claim_id.as_uuid(),
                    amount: e.amount.amount(),
                })
                .collect(),
            daily_capacity: write.limits.daily_capacity.map(i64::from),
            max_batch_size: write.limits.max_batch_size.map(i64::from),
        };

        let committed = self.batches.commit(rows).await.map_err(db_to_port_error)?;
        debug!(attached = committed.attached.len(), "Batch write committed");

        Ok(BatchCommit {
            batch: committed.batch.map(row_to_batch).transpose()?,
            attached: committed.attached.into_iter().map(ClaimId::from_uuid).collect(),
        })
    }

    #[instrument(skip(self), fields(insurer_id = %insurer_id))]
    async fn batches_for_insurer(&self, insurer_id: InsurerId) -> Result<Vec<Batch>, PortError> {
        let rows = self
            .batches
            .find_by_insurer(*insurer_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        rows.into_iter().map(row_to_batch).collect()
    }
}

#[async_trait]
impl InsurerStore for PostgresBatchingAdapter {
    async fn get_insurer(&self, id: InsurerId) -> Result<Insurer, PortError> {
        let row = self
            .insurers
            .get_by_id(*id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        row_to_insurer(row)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Insurer>, PortError> {
        self.insurers
            .find_by_code(code)
            .await
            .map_err(db_to_port_error)?
            .map(row_to_insurer)
            .transpose()
    }

    async fn list_insurers(&self) -> Result<Vec<Insurer>, PortError> {
        let rows = self.insurers.list().await.map_err(db_to_port_error)?;
        rows.into_iter().map(row_to_insurer).collect()
    }

    #[instrument(skip(self, insurer), fields(insurer_id = %insurer.id, code = %insurer.code))]
    async fn save_insurer(&self, insurer: &Insurer) -> Result<(), PortError> {
        insurer.validate()?;
        self.insurers
            .upsert(&insurer_to_row(insurer))
            .await
            .map_err(db_to_port_error)?;
        debug!("Insurer stored");
        Ok(())
    }

    #[instrument(skip(self), fields(insurer_id = %id))]
    async fn delete_insurer(&self, id: InsurerId) -> Result<(), PortError> {
        self.insurers
            .delete(*id.as_uuid())
            .await
            .map_err(db_to_port_error)
    }
}

#[async_trait]
impl ProviderStore for PostgresBatchingAdapter {
    async fn get_provider(&self, id: ProviderId) -> Result<Provider, PortError> {
        let row = self
            .providers
            .get_by_id(*id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        Ok(row_to_provider(row))
    }

    #[instrument(skip(self))]
    async fn find_or_create_by_name(&self, name: &str) -> Result<Provider, PortError> {
        let candidate = Provider::new(name);
        let row = self
            .providers
            .find_or_create(ProviderRow {
                id: *candidate.id.as_uuid(),
                name: candidate.name,
                created_at: candidate.created_at,
            })
            .await
            .map_err(db_to_port_error)?;
        Ok(row_to_provider(row))
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

/// Converts a DatabaseError to a PortError
fn db_to_port_error(e: DatabaseError) -> PortError {
    let e = match e {
        DatabaseError::SqlError(inner) => DatabaseError::classify(inner),
        other => other,
    };
    if e.is_connection_error() {
        return PortError::Connection {
            message: e.to_string(),
            source: Some(Box::new(e)),
        };
    }
    match e {
        DatabaseError::NotFound { entity, id } => PortError::not_found(entity, id),
        DatabaseError::DuplicateEntry(msg) | DatabaseError::ForeignKeyViolation(msg) => {
            PortError::conflict(msg)
        }
        DatabaseError::ConstraintViolation(msg) => PortError::validation(msg),
        other => PortError::Internal {
            message: other.to_string(),
            source: Some(Box::new(other)),
        },
    }
}

fn invalid(what: &str, e: impl std::fmt::Display) -> PortError {
    PortError::internal(format!("invalid stored {}: {}", what, e))
}

fn currency_of(code: &str) -> Result<Currency, PortError> {
    Currency::from_code(code.trim()).map_err(|e| invalid("currency", e))
}

fn row_to_claim(data: ClaimWithItems) -> Result<Claim, PortError> {
    let row = data.claim;
    let currency = currency_of(&row.currency)?;
    let priority_level = u8::try_from(row.priority_level).map_err(|e| invalid("priority", e))?;

    let items = data
        .items
        .into_iter()
        .map(|item| {
            Ok(ClaimItem {
                id: ClaimItemId::from_uuid(item.id),
                name: item.name,
                unit_price: Money::new(item.unit_price, currency),
                quantity: u32::try_from(item.quantity).map_err(|e| invalid("quantity", e))?,
                subtotal: Money::new(item.subtotal, currency),
            })
        })
        .collect::<Result<Vec<_>, PortError>>()?;

    Ok(Claim {
        id: ClaimId::from_uuid(row.id),
        provider_id: ProviderId::from_uuid(row.provider_id),
        insurer_id: InsurerId::from_uuid(row.insurer_id),
        encounter_date: row.encounter_date,
        submission_date: row.submission_date,
        specialty: row.specialty,
        priority_level,
        total_amount: Money::new(row.total_amount, currency),
        items,
        created_at: row.created_at,
    })
}

fn claim_to_rows(claim: &Claim) -> (NewClaim, Vec<NewClaimItem>) {
    let row = NewClaim {
        id: *claim.id.as_uuid(),
        provider_id: *claim.provider_id.as_uuid(),
        insurer_id: *claim.insurer_id.as_uuid(),
        encounter_date: claim.encounter_date,
        submission_date: claim.submission_date,
        specialty: claim.specialty.clone(),
        priority_level: i16::from(claim.priority_level),
        total_amount: claim.total_amount.amount(),
        currency: claim.total_amount.currency().code().to_string(),
        created_at: claim.created_at,
    };
    let items = claim
        .items
        .iter()
        .map(|item| NewClaimItem {
            id: *item.id.as_uuid(),
            name: item.name.clone(),
            unit_price: item.unit_price.amount(),
            quantity: i32::try_from(item.quantity).unwrap_or(i32::MAX),
            subtotal: item.subtotal.amount(),
        })
        .collect();
    (row, items)
}

fn row_to_batch(data: BatchWithClaims) -> Result<Batch, PortError> {
    let row = data.batch;
    Ok(Batch {
        id: BatchId::from_uuid(row.id),
        insurer_id: InsurerId::from_uuid(row.insurer_id),
        provider_id: ProviderId::from_uuid(row.provider_id),
        batch_date: row.batch_date,
        total_cost: Money::new(row.total_cost, currency_of(&row.currency)?),
        claim_ids: data.claim_ids.into_iter().map(ClaimId::from_uuid).collect(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_insurer(row: InsurerRow) -> Result<Insurer, PortError> {
    let size = |value: i32, what: &str| u32::try_from(value).map_err(|e| invalid(what, e));
    Ok(Insurer {
        id: InsurerId::from_uuid(row.id),
        name: row.name,
        code: row.code,
        email: row.email,
        date_preference: row
            .date_preference
            .parse()
            .map_err(|e| invalid("date preference", e))?,
        specialty_preferences: row.specialty_preferences.0,
        min_batch_size: size(row.min_batch_size, "min batch size")?,
        max_batch_size: size(row.max_batch_size, "max batch size")?,
        daily_capacity: size(row.daily_capacity, "daily capacity")?,
    })
}

fn insurer_to_row(insurer: &Insurer) -> InsurerRow {
    let clamp = |value: u32| i32::try_from(value).unwrap_or(i32::MAX);
    InsurerRow {
        id: *insurer.id.as_uuid(),
        name: insurer.name.clone(),
        code: insurer.code.clone(),
        email: insurer.email.clone(),
        date_preference: insurer.date_preference.as_str().to_string(),
        specialty_preferences: Json(insurer.specialty_preferences.clone()),
        min_batch_size: clamp(insurer.min_batch_size),
        max_batch_size: clamp(insurer.max_batch_size),
        daily_capacity: clamp(insurer.daily_capacity),
    }
}

fn row_to_provider(row: ProviderRow) -> Provider {
    Provider {
        id: ProviderId::from_uuid(row.id),
        name: row.name,
        created_at: row.created_at,
    }
}
