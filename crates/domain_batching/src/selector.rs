//! Greedy claim selection for one batch
//!
//! Given the candidate claims of one (provider, batch_date) group, picks the
//! claims that go into a single batch. When there are more candidates than
//! fit, claims are ranked by one total order:
//!
//! 1. priority score, descending (priority 1 first)
//! 2. cost per amount, ascending (claims with no positive amount last)
//! 3. claim id, ascending

use std::cmp::Ordering;

use rust_decimal::Decimal;

use core_kernel::ClaimId;
use domain_claims::{Claim, Insurer};

use crate::cost::processing_cost;

/// Size bounds for one selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    pub min_size: usize,
    pub max_size: usize,
}

impl SelectionPolicy {
    pub fn new(min_size: usize, max_size: usize) -> Self {
        Self { min_size, max_size }
    }

    /// The insurer's configured batch size bounds
    pub fn for_insurer(insurer: &Insurer) -> Self {
        Self::new(
            insurer.min_batch_size as usize,
            insurer.max_batch_size as usize,
        )
    }

    /// Lowers the ceiling, e.g. to the room left in an existing batch
    pub fn capped_at(self, limit: usize) -> Self {
        Self {
            min_size: self.min_size,
            max_size: self.max_size.min(limit),
        }
    }
}

/// (6 - priority) x 10, so priority 1 scores 50
pub fn priority_score(priority_level: u8) -> i32 {
    (6 - i32::from(priority_level)) * 10
}

/// Processing cost per unit of claim amount; None when the amount is not positive
pub fn cost_per_amount(claim: &Claim, insurer: &Insurer) -> Option<Decimal> {
    let amount = claim.total_amount.amount();
    if amount <= Decimal::ZERO {
        return None;
    }
    processing_cost(claim, insurer).checked_div(amount)
}

/// A candidate with its precomputed sort keys
#[derive(Debug, Clone, Copy)]
struct Ranked<'a> {
    claim: &'a Claim,
    score: i32,
    cost_per_amount: Option<Decimal>,
}

impl<'a> Ranked<'a> {
    fn new(claim: &'a Claim, insurer: &Insurer) -> Self {
        Self {
            claim,
            score: priority_score(claim.priority_level),
            cost_per_amount: cost_per_amount(claim, insurer),
        }
    }

    fn id(&self) -> ClaimId {
        self.claim.id
    }
}

fn rank_order(a: &Ranked<'_>, b: &Ranked<'_>) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| match (a.cost_per_amount, b.cost_per_amount) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id().cmp(&b.id()))
}

/// Orders claims best-first for selection
pub fn rank_claims<'a>(candidates: &'a [Claim], insurer: &Insurer) -> Vec<&'a Claim> {
    let mut ranked: Vec<Ranked<'a>> = candidates
        .iter()
        .map(|claim| Ranked::new(claim, insurer))
        .collect();
    ranked.sort_by(rank_order);
    ranked.into_iter().map(|r| r.claim).collect()
}

/// Chooses the claims for one batch
///
/// - `force`: the first `max_size` claims in their current order
/// - fewer than `min_size` candidates: nothing
/// - at most `max_size` candidates: all of them
/// - otherwise: the best `max_size` by rank
///
/// Unless forced, the result is either empty or at least `min_size` long.
pub fn select_claims<'a>(
    candidates: &'a [Claim],
    insurer: &Insurer,
    policy: SelectionPolicy,
    force: bool,
) -> Vec<&'a Claim> {
    if force {
        return candidates.iter().take(policy.max_size).collect();
    }
    if candidates.len() < policy.min_size || policy.max_size < policy.min_size {
        return Vec::new();
    }
    if candidates.len() <= policy.max_size {
        return candidates.iter().collect();
    }

    let mut ranked = rank_claims(candidates, insurer);
    ranked.truncate(policy.max_size);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use chrono::NaiveDate;
    use core_kernel::{InsurerId, Money, ProviderId};
    use domain_claims::DatePreference;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn id(n: u128) -> ClaimId {
        ClaimId::from_uuid(Uuid::from_u128(n))
    }

    fn insurer() -> Insurer {
        Insurer {
            id: InsurerId::new(),
            name: "Insurer A".to_string(),
            code: "INS-A".to_string(),
            email: None,
            date_preference: DatePreference::Encounter,
            specialty_preferences: BTreeMap::new(),
            min_batch_size: 3,
            max_batch_size: 5,
            daily_capacity: 50,
        }
    }

    fn claim(n: u128, priority: u8, amount: Decimal) -> Claim {
        let date = NaiveDate::from_ymd_opt(2025, 7, 10).unwrap();
        Claim {
            id: id(n),
            provider_id: ProviderId::new(),
            insurer_id: InsurerId::new(),
            encounter_date: date,
            submission_date: date,
            specialty: "cardiology".to_string(),
            priority_level: priority,
            total_amount: Money::usd(amount),
            items: Vec::new(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_below_minimum_selects_nothing() {
        let claims = vec![claim(1, 3, dec!(100)), claim(2, 3, dec!(100))];
        let selected = select_claims(&claims, &insurer(), SelectionPolicy::new(3, 5), false);
        assert!(selected.is_empty());
    }

    #[test]
    fn test_force_takes_prefix() {
        let claims = vec![claim(9, 5, dec!(100)), claim(1, 1, dec!(100))];
        let selected = select_claims(&claims, &insurer(), SelectionPolicy::new(3, 1), true);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, id(9));
    }

    #[test]
    fn test_within_bounds_takes_all_in_order() {
        let claims: Vec<Claim> = (1..=4).map(|n| claim(n, 3, dec!(100))).collect();
        let selected = select_claims(&claims, &insurer(), SelectionPolicy::new(3, 5), false);
        assert_eq!(selected.len(), 4);
    }

    #[test]
    fn test_overflow_prefers_priority_then_cheaper_per_dollar() {
        let claims = vec![
            claim(1, 4, dec!(100)),
            claim(2, 1, dec!(100)),
            // same priority as #4 but costs more per dollar
            claim(3, 2, dec!(100)),
            claim(4, 2, dec!(2000)),
        ];
        let selected = select_claims(&claims, &insurer(), SelectionPolicy::new(1, 3), false);
        let ids: Vec<ClaimId> = selected.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![id(2), id(4), id(3)]);
    }

    #[test]
    fn test_ties_break_on_claim_id() {
        let claims = vec![
            claim(7, 3, dec!(100)),
            claim(5, 3, dec!(100)),
            claim(6, 3, dec!(100)),
        ];
        let selected = select_claims(&claims, &insurer(), SelectionPolicy::new(1, 2), false);
        let ids: Vec<ClaimId> = selected.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![id(5), id(6)]);
    }

    #[test]
    fn test_zero_amount_ranks_last_within_priority() {
        let claims = vec![claim(1, 3, dec!(0)), claim(2, 3, dec!(50000)), claim(3, 4, dec!(10))];
        let ranked = rank_claims(&claims, &insurer());
        assert_eq!(ranked[0].id, id(2));
        assert_eq!(ranked[1].id, id(1));
        assert_eq!(ranked[2].id, id(3));
    }

    #[test]
    fn test_capped_policy_never_exceeds_room() {
        let claims: Vec<Claim> = (1..=10).map(|n| claim(n, 3, dec!(100))).collect();
        let policy = SelectionPolicy::new(3, 5).capped_at(4);
        assert_eq!(select_claims(&claims, &insurer(), policy, false).len(), 4);
    }

    #[test]
    fn test_room_below_minimum_selects_nothing() {
        let claims: Vec<Claim> = (1..=10).map(|n| claim(n, 3, dec!(100))).collect();
        let policy = SelectionPolicy::new(3, 5).capped_at(2);
        assert!(select_claims(&claims, &insurer(), policy, false).is_empty());
    }
}
