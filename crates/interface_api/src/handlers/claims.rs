//! Claims handlers

use axum::{extract::{Path, State}, http::StatusCode, Json};
use uuid::Uuid;
use validator::Validate;

use core_kernel::ClaimId;
use domain_batching::cost_breakdown;

use crate::{AppState, error::ApiError};
use crate::dto::claims::*;

/// Submits a claim and assigns it to a batch
pub async fn submit_claim(
    State(state): State<AppState>,
    Json(request): Json<CreateClaimRequest>,
) -> Result<(StatusCode, Json<ClaimSubmissionResponse>), ApiError> {
    request.validate()?;

    let receipt = state.intake.submit(request.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ClaimSubmissionResponse {
            claim: receipt.claim,
            assignment: receipt.assignment,
        }),
    ))
}

/// Breaks down a claim's processing cost under its insurer
pub async fn get_claim_cost(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimCostResponse>, ApiError> {
    let claim = state.ports.claims.get_claim(ClaimId::from_uuid(id)).await?;
    let insurer = state.ports.insurers.get_insurer(claim.insurer_id).await?;

    Ok(Json(ClaimCostResponse {
        claim_id: id,
        insurer_id: *insurer.id.as_uuid(),
        total_amount: claim.total_amount.amount(),
        breakdown: cost_breakdown(&claim, &insurer),
    }))
}
