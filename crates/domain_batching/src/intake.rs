//! Claim intake: resolve, persist, assign

use serde::Serialize;
use tracing::{info, instrument};

use domain_claims::{Claim, ClaimSubmission};

use crate::assignment::{AssignmentOutcome, ClaimAssigner};
use crate::error::BatchingError;
use crate::ports::BatchingPorts;

/// A stored claim and what assignment did with it
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub claim: Claim,
    pub assignment: AssignmentOutcome,
}

/// Turns submissions into stored, assigned claims
#[derive(Clone)]
pub struct ClaimIntake {
    ports: BatchingPorts,
    assigner: ClaimAssigner,
}

impl ClaimIntake {
    pub fn new(ports: BatchingPorts) -> Self {
        let assigner = ClaimAssigner::new(ports.clone());
        Self { ports, assigner }
    }

    pub fn assigner(&self) -> &ClaimAssigner {
        &self.assigner
    }

    /// Validates and stores a submission, then assigns the claim
    ///
    /// # Errors
    ///
    /// - `Claim` when the submission is invalid
    /// - `InsurerNotFound` when no insurer has the submitted code
    /// - `Store` when the claim cannot be stored
    ///
    /// Assignment problems do not fail the submission; they are reported in
    /// the receipt.
    #[instrument(skip(self, submission), fields(insurer_code = %submission.insurer_code))]
    pub async fn submit(&self, submission: ClaimSubmission) -> Result<SubmissionReceipt, BatchingError> {
        submission.validate()?;

        let insurer = self
            .ports
            .insurers
            .find_by_code(&submission.insurer_code)
            .await?
            .ok_or_else(|| BatchingError::InsurerNotFound(submission.insurer_code.clone()))?;

        let provider = self
            .ports
            .providers
            .find_or_create_by_name(submission.provider_name.trim())
            .await?;

        let claim = submission.into_claim(provider.id, insurer.id)?;
        self.ports.claims.insert_claim(&claim).await?;
        info!(
            claim_id = %claim.id,
            insurer_id = %insurer.id,
            provider_id = %provider.id,
            total_amount = %claim.total_amount,
            "Claim submitted"
        );

        let assignment = self.assigner.assign(&claim).await;
        Ok(SubmissionReceipt { claim, assignment })
    }
}
