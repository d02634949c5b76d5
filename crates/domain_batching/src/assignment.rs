//! Assignment of a newly submitted claim
//!
//! Runs once per claim: skips claims that already belong to a batch, runs
//! the optimizer for the claim's insurer and relevant date, and falls back to
//! attaching the claim on its own when the optimizer produced nothing.
//! Nothing here returns an error; every path ends in an
//! [`AssignmentOutcome`].

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use core_kernel::BatchId;
use domain_claims::{Batch, BatchKey, Claim, Insurer};

use crate::notification::BatchNotification;
use crate::optimizer::{BatchOptimizer, OptimizationResult};
use crate::ports::{AttachLimits, BatchEntry, BatchWrite, BatchingPorts};

/// How a claim assignment ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssignmentOutcome {
    /// The claim was already in a batch; nothing changed
    AlreadyBatched { batch_id: BatchId },
    /// The claim's insurer does not exist
    MissingInsurer,
    /// The optimizer produced batches (which may or may not include this claim)
    Optimized { result: OptimizationResult },
    /// The claim was attached on its own
    Fallback { batch: Batch },
    /// A store failure stopped the assignment; the claim stays unbatched
    Failed { reason: String },
}

impl AssignmentOutcome {
    /// Batches this assignment created or extended
    pub fn batches(&self) -> Vec<&Batch> {
        match self {
            AssignmentOutcome::Optimized { result } => result.batches.iter().collect(),
            AssignmentOutcome::Fallback { batch } => vec![batch],
            _ => Vec::new(),
        }
    }
}

/// Entry point run for each new claim
#[derive(Clone)]
pub struct ClaimAssigner {
    ports: BatchingPorts,
    optimizer: BatchOptimizer,
}

impl ClaimAssigner {
    pub fn new(ports: BatchingPorts) -> Self {
        let optimizer = BatchOptimizer::new(ports.claims.clone(), ports.batches.clone());
        Self { ports, optimizer }
    }

    pub fn optimizer(&self) -> &BatchOptimizer {
        &self.optimizer
    }

    #[instrument(skip(self, claim), fields(claim_id = %claim.id))]
    pub async fn assign(&self, claim: &Claim) -> AssignmentOutcome {
        match self.ports.batches.batch_of_claim(claim.id).await {
            Ok(Some(batch_id)) => {
                debug!(claim_id = %claim.id, batch_id = %batch_id, "Claim already batched");
                return AssignmentOutcome::AlreadyBatched { batch_id };
            }
            Ok(None) => {}
            Err(e) => return self.failed(claim, "batch membership lookup", e),
        }

        let insurer = match self.ports.insurers.get_insurer(claim.insurer_id).await {
            Ok(insurer) => insurer,
            Err(e) if e.is_not_found() => {
                error!(
                    claim_id = %claim.id,
                    insurer_id = %claim.insurer_id,
                    "Claim is missing an insurer"
                );
                return AssignmentOutcome::MissingInsurer;
            }
            Err(e) => return self.failed(claim, "insurer lookup", e),
        };

        let relevant_date = insurer.relevant_date(claim);
        let result = match self.optimizer.optimize(&insurer, relevant_date).await {
            Ok(result) => result,
            Err(e) => return self.failed(claim, "optimization", e),
        };

        if result.batches.is_empty() {
            return self.attach_alone(claim, &insurer).await;
        }

        for batch in &result.batches {
            self.notify(&insurer, batch).await;
        }
        info!(
            claim_id = %claim.id,
            insurer_id = %insurer.id,
            batches = result.batches.len(),
            total_cost = %result.total_cost,
            notes = ?result.optimization_notes,
            "Optimized batching completed"
        );
        AssignmentOutcome::Optimized { result }
    }

    /// Attaches the claim to its own key with no size or capacity check
    async fn attach_alone(&self, claim: &Claim, insurer: &Insurer) -> AssignmentOutcome {
        let write = BatchWrite {
            key: BatchKey::new(insurer.id, claim.provider_id, insurer.batch_date_for(claim)),
            entries: vec![BatchEntry::from(claim)],
            limits: AttachLimits::unbounded(),
        };

        match self.ports.batches.commit_batch(write).await {
            Ok(commit) => match commit.batch {
                Some(batch) if !commit.attached.is_empty() => {
                    info!(claim_id = %claim.id, batch_id = %batch.id, "Claim attached by fallback");
                    self.notify(insurer, &batch).await;
                    AssignmentOutcome::Fallback { batch }
                }
                Some(batch) => AssignmentOutcome::AlreadyBatched { batch_id: batch.id },
                None => AssignmentOutcome::Failed {
                    reason: "claim could not be attached".to_string(),
                },
            },
            Err(e) => self.failed(claim, "fallback batch write", e),
        }
    }

    /// Best-effort batch-ready notification
    async fn notify(&self, insurer: &Insurer, batch: &Batch) {
        let Some(recipient) = insurer.email.as_deref() else {
            debug!(insurer_id = %insurer.id, "Insurer has no email, skipping notification");
            return;
        };

        let provider_name = match self.ports.providers.get_provider(batch.provider_id).await {
            Ok(provider) => provider.name,
            Err(e) => {
                warn!(provider_id = %batch.provider_id, error = %e, "Provider lookup failed for notification");
                batch.provider_id.to_string()
            }
        };

        let notification = BatchNotification::for_batch(batch, &provider_name);
        if let Err(e) = self
            .ports
            .notifier
            .send_batch_ready(&notification, recipient)
            .await
        {
            warn!(batch_id = %batch.id, error = %e, "Batch notification failed");
        }
    }

    fn failed(&self, claim: &Claim, stage: &str, e: impl std::fmt::Display) -> AssignmentOutcome {
        error!(
            claim_id = %claim.id,
            insurer_id = %claim.insurer_id,
            provider_id = %claim.provider_id,
            stage,
            error = %e,
            "Claim assignment failed"
        );
        AssignmentOutcome::Failed {
            reason: format!("{} failed: {}", stage, e),
        }
    }
}
