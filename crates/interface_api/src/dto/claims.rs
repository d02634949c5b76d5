//! Claims DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_batching::{AssignmentOutcome, CostBreakdown};
use domain_claims::{Claim, ClaimSubmission, ItemSubmission};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClaimRequest {
    #[validate(length(min = 1, max = 200))]
    pub provider_name: String,
    #[validate(length(min = 1, max = 50))]
    pub insurer_code: String,
    pub encounter_date: NaiveDate,
    pub submission_date: NaiveDate,
    #[validate(length(min = 1, max = 100))]
    pub specialty: String,
    #[validate(range(min = 1, max = 5))]
    pub priority_level: u8,
    #[validate(length(min = 1), nested)]
    pub items: Vec<ClaimItemRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ClaimItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub unit_price: Decimal,
    #[validate(range(min = 1))]
    pub quantity: u32,
}

impl From<CreateClaimRequest> for ClaimSubmission {
    fn from(request: CreateClaimRequest) -> Self {
        ClaimSubmission {
            provider_name: request.provider_name,
            insurer_code: request.insurer_code,
            encounter_date: request.encounter_date,
            submission_date: request.submission_date,
            specialty: request.specialty,
            priority_level: request.priority_level,
            items: request
                .items
                .into_iter()
                .map(|item| ItemSubmission {
                    name: item.name,
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                })
                .collect(),
        }
    }
}

/// A stored claim and what batching did with it
#[derive(Debug, Serialize)]
pub struct ClaimSubmissionResponse {
    pub claim: Claim,
    pub assignment: AssignmentOutcome,
}

#[derive(Debug, Serialize)]
pub struct ClaimCostResponse {
    pub claim_id: Uuid,
    pub insurer_id: Uuid,
    pub total_amount: Decimal,
    pub breakdown: CostBreakdown,
}
