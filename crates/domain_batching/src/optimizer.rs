//! Batching orchestration
//!
//! [`BatchOptimizer::optimize`] batches the unbatched claims of one insurer
//! for one relevant date:
//!
//! ```text
//! claims (priority asc, amount desc)
//!   -> groups by (provider, batch_date), first-seen order
//!   -> per group: capacity check -> select -> commit -> repeat while room
//! ```
//!
//! Groups are independent: a failed batch write is logged and noted, and the
//! remaining groups still run.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use core_kernel::{round_half_up, ClaimId, ProviderId};
use domain_claims::insurer::batch_date_from;
use domain_claims::{Batch, BatchKey, Claim, Insurer};

use crate::cost::batch_processing_cost;
use crate::error::BatchingError;
use crate::ports::{AttachLimits, BatchEntry, BatchStore, BatchWrite, ClaimStore};
use crate::selector::{select_claims, SelectionPolicy};

pub const NOTE_NO_CLAIMS: &str = "No claims to batch";
pub const NOTE_BELOW_MINIMUM: &str = "No claims meet batch size constraints";

/// Result of one optimization run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Batches created or extended by this run, each once
    pub batches: Vec<Batch>,
    /// Processing cost of every claim attached by this run
    pub total_cost: Decimal,
    /// One note per group, or a single note when there was nothing to do
    pub optimization_notes: Vec<String>,
}

impl OptimizationResult {
    fn record_batch(&mut self, batch: Batch) {
        match self.batches.iter_mut().find(|b| b.id == batch.id) {
            Some(existing) => *existing = batch,
            None => self.batches.push(batch),
        }
    }

    /// Claims attached across all returned batches
    pub fn claim_count(&self) -> usize {
        self.batches.iter().map(Batch::claim_count).sum()
    }
}

/// Claims of one provider landing on one batch_date
#[derive(Debug)]
struct ClaimGroup {
    provider_id: ProviderId,
    batch_date: NaiveDate,
    claims: Vec<Claim>,
}

/// Buckets claims by (provider, batch_date), keeping first-seen order
fn group_claims(claims: Vec<Claim>, insurer: &Insurer) -> Vec<ClaimGroup> {
    let mut groups: Vec<ClaimGroup> = Vec::new();
    let mut index: HashMap<(ProviderId, NaiveDate), usize> = HashMap::new();

    for claim in claims {
        let batch_date = batch_date_from(insurer.relevant_date(&claim));
        let slot = *index
            .entry((claim.provider_id, batch_date))
            .or_insert_with(|| {
                groups.push(ClaimGroup {
                    provider_id: claim.provider_id,
                    batch_date,
                    claims: Vec::new(),
                });
                groups.len() - 1
            });
        groups[slot].claims.push(claim);
    }

    groups
}

/// What happened to one group
#[derive(Debug, Default)]
struct GroupOutcome {
    batches: Vec<Batch>,
    claims_attached: usize,
    cost: Decimal,
    note: String,
}

/// Orchestrates claim selection and batch writes
#[derive(Clone)]
pub struct BatchOptimizer {
    claims: Arc<dyn ClaimStore>,
    batches: Arc<dyn BatchStore>,
}

impl BatchOptimizer {
    pub fn new(claims: Arc<dyn ClaimStore>, batches: Arc<dyn BatchStore>) -> Self {
        Self { claims, batches }
    }

    /// Batches the insurer's unbatched claims whose relevant date is `date`
    ///
    /// # Errors
    ///
    /// Only when the candidate claims cannot be read. Everything after that
    /// is reported through the notes.
    #[instrument(skip(self, insurer), fields(insurer_id = %insurer.id))]
    pub async fn optimize(
        &self,
        insurer: &Insurer,
        date: NaiveDate,
    ) -> Result<OptimizationResult, BatchingError> {
        let claims = self
            .claims
            .unbatched_claims_for_date(insurer.id, insurer.date_preference, date)
            .await?;

        let mut result = OptimizationResult::default();
        if claims.is_empty() {
            result.optimization_notes.push(NOTE_NO_CLAIMS.to_string());
            return Ok(result);
        }

        let groups = group_claims(claims, insurer);
        // a lone undersized group is batched anyway rather than starved
        let force = groups.len() == 1
            && groups
                .first()
                .is_some_and(|g| g.claims.len() < insurer.min_batch_size as usize);

        let mut total_cost = Decimal::ZERO;
        for group in groups {
            let provider_id = group.provider_id;
            let batch_date = group.batch_date;

            match self.batch_group(insurer, group, force).await {
                Ok(outcome) => {
                    total_cost += outcome.cost;
                    for batch in outcome.batches {
                        result.record_batch(batch);
                    }
                    result.optimization_notes.push(outcome.note);
                }
                Err(e) => {
                    error!(
                        insurer_id = %insurer.id,
                        provider_id = %provider_id,
                        %batch_date,
                        error = %e,
                        "Failed to batch claim group"
                    );
                    result
                        .optimization_notes
                        .push(format!("Failed to batch claims for {}: {}", batch_date, e));
                }
            }
        }

        result.total_cost = round_half_up(total_cost, 2);
        info!(
            insurer_id = %insurer.id,
            %date,
            batches = result.batches.len(),
            total_cost = %result.total_cost,
            "Batch optimization completed"
        );
        Ok(result)
    }

    async fn batch_group(
        &self,
        insurer: &Insurer,
        group: ClaimGroup,
        force: bool,
    ) -> Result<GroupOutcome, BatchingError> {
        let key = BatchKey::new(insurer.id, group.provider_id, group.batch_date);

        let attached = self
            .batches
            .attached_count(insurer.id, group.batch_date)
            .await?;
        let available = insurer.daily_capacity.saturating_sub(attached) as usize;
        if available == 0 {
            debug!(insurer_id = %insurer.id, batch_date = %group.batch_date, "Daily capacity exhausted");
            return Ok(GroupOutcome {
                note: format!("Daily capacity exceeded for {}", group.batch_date),
                ..GroupOutcome::default()
            });
        }

        let mut candidates = group.claims;
        candidates.truncate(available);

        let max_size = insurer.max_batch_size as usize;
        let base_policy = SelectionPolicy::for_insurer(insurer);
        let mut room = match self.batches.find_batch(key).await? {
            Some(batch) => max_size.saturating_sub(batch.claim_count()),
            None => max_size,
        };

        let mut outcome = GroupOutcome::default();
        let mut batch_ids = HashSet::new();

        loop {
            if room == 0 || (!force && room < base_policy.min_size) {
                break;
            }

            let selected = select_claims(&candidates, insurer, base_policy.capped_at(room), force);
            if selected.is_empty() {
                break;
            }

            let write = BatchWrite {
                key,
                entries: selected.iter().map(|c| BatchEntry::from(*c)).collect(),
                limits: AttachLimits::for_insurer(insurer),
            };
            let selected_ids: HashSet<ClaimId> = selected.iter().map(|c| c.id).collect();

            let commit = match self.batches.commit_batch(write).await {
                Ok(commit) => commit,
                Err(e) => {
                    error!(
                        insurer_id = %insurer.id,
                        provider_id = %key.provider_id,
                        batch_date = %key.batch_date,
                        claims = selected_ids.len(),
                        error = %e,
                        "Batch write failed, claims left unbatched"
                    );
                    outcome.note = format!(
                        "Failed to create batch for {}: {}",
                        key.batch_date, e
                    );
                    return Ok(outcome);
                }
            };

            let Some(batch) = commit.batch else {
                break;
            };
            if commit.attached.is_empty() {
                warn!(batch_id = %batch.id, "Selected claims were batched elsewhere");
                break;
            }

            let attached_ids: HashSet<ClaimId> = commit.attached.iter().copied().collect();
            outcome.cost += batch_processing_cost(
                candidates.iter().filter(|c| attached_ids.contains(&c.id)),
                insurer,
            );
            outcome.claims_attached += attached_ids.len();

            room = max_size.saturating_sub(batch.claim_count());
            batch_ids.insert(batch.id);
            match outcome.batches.iter_mut().find(|b| b.id == batch.id) {
                Some(existing) => *existing = batch,
                None => outcome.batches.push(batch),
            }

            candidates.retain(|c| !selected_ids.contains(&c.id));
            if force {
                break;
            }
        }

        outcome.note = if outcome.claims_attached == 0 {
            NOTE_BELOW_MINIMUM.to_string()
        } else {
            format!(
                "Created {} batches with a total of {} claims, cost: ${:.2}",
                batch_ids.len(),
                outcome.claims_attached,
                round_half_up(outcome.cost, 2)
            )
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use core_kernel::{InsurerId, Money};
    use domain_claims::DatePreference;
    use rust_decimal_macros::dec;

    use crate::ports::mock::InMemoryStore;

    fn insurer(min: u32, max: u32, capacity: u32) -> Insurer {
        Insurer {
            id: InsurerId::new(),
            name: "Insurer A".to_string(),
            code: "INS-A".to_string(),
            email: None,
            date_preference: DatePreference::Encounter,
            specialty_preferences: BTreeMap::new(),
            min_batch_size: min,
            max_batch_size: max,
            daily_capacity: capacity,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 22).unwrap()
    }

    fn claim(insurer: &Insurer, provider_id: ProviderId) -> Claim {
        Claim {
            id: ClaimId::new_v7(),
            provider_id,
            insurer_id: insurer.id,
            encounter_date: date(),
            submission_date: date(),
            specialty: "neurology".to_string(),
            priority_level: 3,
            total_amount: Money::usd(dec!(1000)),
            items: Vec::new(),
            created_at: chrono::Utc::now(),
        }
    }

    async fn optimizer_with(claims: &[Claim]) -> (Arc<InMemoryStore>, BatchOptimizer) {
        let store = Arc::new(InMemoryStore::new());
        for c in claims {
            store.insert_claim(c).await.unwrap();
        }
        let optimizer = BatchOptimizer::new(store.clone(), store.clone());
        (store, optimizer)
    }

    #[test]
    fn test_grouping_keeps_first_seen_order() {
        let insurer = insurer(1, 5, 10);
        let (a, b) = (ProviderId::new(), ProviderId::new());
        let claims = vec![claim(&insurer, b), claim(&insurer, a), claim(&insurer, b)];

        let groups = group_claims(claims, &insurer);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].provider_id, b);
        assert_eq!(groups[0].claims.len(), 2);
        assert_eq!(groups[0].batch_date, NaiveDate::from_ymd_opt(2025, 6, 21).unwrap());
    }

    #[tokio::test]
    async fn test_no_claims_is_not_an_error() {
        let (_, optimizer) = optimizer_with(&[]).await;
        let result = optimizer.optimize(&insurer(3, 15, 50), date()).await.unwrap();
        assert!(result.batches.is_empty());
        assert_eq!(result.optimization_notes, vec![NOTE_NO_CLAIMS.to_string()]);
    }

    #[tokio::test]
    async fn test_undersized_groups_are_deferred_when_several_exist() {
        let insurer = insurer(3, 15, 50);
        let claims = vec![
            claim(&insurer, ProviderId::new()),
            claim(&insurer, ProviderId::new()),
        ];
        let (store, optimizer) = optimizer_with(&claims).await;

        let result = optimizer.optimize(&insurer, date()).await.unwrap();
        assert!(result.batches.is_empty());
        assert_eq!(result.optimization_notes.len(), 2);
        assert!(result.optimization_notes.iter().all(|n| n == NOTE_BELOW_MINIMUM));
        assert_eq!(store.batch_count().await, 0);
    }

    #[tokio::test]
    async fn test_existing_batch_is_topped_up_to_max() {
        let insurer = insurer(1, 4, 50);
        let provider = ProviderId::new();
        let claims: Vec<Claim> = (0..6).map(|_| claim(&insurer, provider)).collect();
        let (store, optimizer) = optimizer_with(&claims[..3]).await;

        let first = optimizer.optimize(&insurer, date()).await.unwrap();
        assert_eq!(first.claim_count(), 3);

        for c in &claims[3..] {
            store.insert_claim(c).await.unwrap();
        }
        let second = optimizer.optimize(&insurer, date()).await.unwrap();

        // only one slot left in the batch for the three new claims
        assert_eq!(second.batches.len(), 1);
        assert_eq!(second.batches[0].claim_count(), 4);
        assert_eq!(first.batches[0].id, second.batches[0].id);
    }
}
