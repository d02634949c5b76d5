//! Insurer handlers: management, batches, optimization and reports

use axum::{extract::{Path, State}, http::StatusCode, Json};
use chrono::{NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use core_kernel::InsurerId;
use domain_batching::{
    BatchOptimizer, CostAnalysis, CostAnalyzer, OptimizationAdvisor, OptimizationRecommendations,
    OptimizationResult,
};
use domain_claims::{Batch, Insurer};

use crate::{AppState, error::ApiError};
use crate::dto::insurers::*;

/// Lists insurers
pub async fn list_insurers(
    State(state): State<AppState>,
) -> Result<Json<Vec<InsurerSummary>>, ApiError> {
    let insurers = state.ports.insurers.list_insurers().await?;
    Ok(Json(insurers.iter().map(InsurerSummary::from).collect()))
}

/// Gets an insurer with its batching policy
pub async fn get_insurer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Insurer>, ApiError> {
    let insurer = state.ports.insurers.get_insurer(InsurerId::from_uuid(id)).await?;
    Ok(Json(insurer))
}

/// Creates an insurer with its batching policy
pub async fn create_insurer(
    State(state): State<AppState>,
    Json(request): Json<CreateInsurerRequest>,
) -> Result<(StatusCode, Json<Insurer>), ApiError> {
    request.validate()?;
    let insurer = request.into_insurer();

    state.ports.insurers.save_insurer(&insurer).await?;
    info!(insurer_id = %insurer.id, code = %insurer.code, "Insurer created");

    Ok((StatusCode::CREATED, Json(insurer)))
}

/// Updates the fields present in the body
pub async fn update_insurer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateInsurerRequest>,
) -> Result<Json<Insurer>, ApiError> {
    request.validate()?;
    let current = state.ports.insurers.get_insurer(InsurerId::from_uuid(id)).await?;
    let insurer = request.apply(current);

    state.ports.insurers.save_insurer(&insurer).await?;
    info!(insurer_id = %insurer.id, "Insurer updated");

    Ok(Json(insurer))
}

/// Deletes an insurer that has no claims or batches
pub async fn delete_insurer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let insurer_id = InsurerId::from_uuid(id);
    state
        .ports
        .insurers
        .delete_insurer(insurer_id)
        .await
        .map_err(|e| {
            if e.is_conflict() {
                ApiError::Conflict(format!("Insurer {} still has claims or batches", id))
            } else {
                e.into()
            }
        })?;
    info!(insurer_id = %insurer_id, "Insurer deleted");

    Ok(Json(MessageResponse {
        message: "Insurer deleted successfully".to_string(),
    }))
}

/// Resolves an insurer from its id or its code
async fn resolve_insurer(state: &AppState, reference: &str) -> Result<Insurer, ApiError> {
    if let Ok(id) = reference.parse::<Uuid>() {
        return Ok(state.ports.insurers.get_insurer(InsurerId::from_uuid(id)).await?);
    }
    state
        .ports
        .insurers
        .find_by_code(reference)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Insurer with code '{}' not found", reference)))
}

async fn load_batch_details(
    state: &AppState,
    reference: &str,
    batch_date: Option<NaiveDate>,
) -> Result<BatchDetailsResponse, ApiError> {
    let insurer = resolve_insurer(state, reference).await?;
    let batch = state
        .ports
        .batches
        .batches_for_insurer(insurer.id)
        .await?
        .into_iter()
        .find(|b| batch_date.map_or(true, |date| b.batch_date == date))
        .ok_or_else(|| ApiError::NotFound(format!("No batch found for insurer {}", insurer.code)))?;

    let mut claims = Vec::with_capacity(batch.claim_count());
    for claim_id in &batch.claim_ids {
        claims.push(state.ports.claims.get_claim(*claim_id).await?);
    }

    Ok(BatchDetailsResponse { batch, claims })
}

/// The newest batch of an insurer, with its claims
pub async fn latest_batch_details(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<BatchDetailsResponse>, ApiError> {
    Ok(Json(load_batch_details(&state, &reference, None).await?))
}

/// A batch of an insurer on one batch date, with its claims
pub async fn batch_details_on(
    State(state): State<AppState>,
    Path((reference, batch_date)): Path<(String, NaiveDate)>,
) -> Result<Json<BatchDetailsResponse>, ApiError> {
    Ok(Json(load_batch_details(&state, &reference, Some(batch_date)).await?))
}

/// Lists an insurer's batches, newest batch date first
pub async fn list_batches(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Batch>>, ApiError> {
    let insurer = state.ports.insurers.get_insurer(InsurerId::from_uuid(id)).await?;
    let mut batches = state.ports.batches.batches_for_insurer(insurer.id).await?;
    batches.sort_by(|a, b| b.batch_date.cmp(&a.batch_date));
    Ok(Json(batches))
}

/// Runs the optimizer for one date
pub async fn optimize(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<OptimizeRequest>>,
) -> Result<Json<OptimizationResult>, ApiError> {
    let insurer = state.ports.insurers.get_insurer(InsurerId::from_uuid(id)).await?;
    let date = body
        .and_then(|Json(request)| request.date)
        .unwrap_or_else(|| Utc::now().date_naive());

    let optimizer = BatchOptimizer::new(state.ports.claims.clone(), state.ports.batches.clone());
    let result = optimizer.optimize(&insurer, date).await?;
    Ok(Json(result))
}

/// Cost analysis over all of an insurer's claims
pub async fn cost_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CostAnalysis>, ApiError> {
    let insurer = state.ports.insurers.get_insurer(InsurerId::from_uuid(id)).await?;
    let analyzer = CostAnalyzer::new(state.ports.claims.clone(), state.ports.providers.clone());
    Ok(Json(analyzer.analyze(&insurer).await?))
}

/// Recommendations over an insurer's unbatched claims
pub async fn recommendations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OptimizationRecommendations>, ApiError> {
    let insurer = state.ports.insurers.get_insurer(InsurerId::from_uuid(id)).await?;
    let advisor = OptimizationAdvisor::new(state.ports.claims.clone(), state.ports.batches.clone());
    let today = Utc::now().date_naive();
    Ok(Json(advisor.recommend(&insurer, today).await?))
}
