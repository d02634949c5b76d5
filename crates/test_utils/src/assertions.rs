//! Custom Test Assertions
//!
//! Checks for the batch invariants, with messages that name the offending
//! batch or claim.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use core_kernel::{BatchId, ClaimId, InsurerId};
use domain_claims::{Batch, Insurer};

/// Asserts that two decimals differ by at most `tolerance`
pub fn assert_decimal_approx_eq(actual: Decimal, expected: Decimal, tolerance: Decimal) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "Values differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual,
        expected,
        diff,
        tolerance
    );
}

/// Asserts that no claim appears in more than one batch
pub fn assert_single_membership(batches: &[Batch]) {
    let mut seen: HashMap<ClaimId, BatchId> = HashMap::new();
    for batch in batches {
        for claim_id in &batch.claim_ids {
            if let Some(other) = seen.insert(*claim_id, batch.id) {
                panic!(
                    "Claim {} is in both batch {} and batch {}",
                    claim_id, other, batch.id
                );
            }
        }
    }
}

/// Asserts that the batches of each (insurer, batch_date) stay within capacity
pub fn assert_capacity_respected(batches: &[Batch], insurer: &Insurer) {
    let mut per_day: HashMap<(InsurerId, NaiveDate), usize> = HashMap::new();
    for batch in batches.iter().filter(|b| b.insurer_id == insurer.id) {
        *per_day.entry((batch.insurer_id, batch.batch_date)).or_default() += batch.claim_count();
    }
    for ((_, date), count) in per_day {
        assert!(
            count <= insurer.daily_capacity as usize,
            "{} claims batched for {} on {}, capacity is {}",
            count,
            insurer.code,
            date,
            insurer.daily_capacity
        );
    }
}

/// Asserts that no batch exceeds the insurer's maximum size
pub fn assert_batch_sizes_within_max(batches: &[Batch], insurer: &Insurer) {
    for batch in batches {
        assert!(
            batch.claim_count() <= insurer.max_batch_size as usize,
            "Batch {} holds {} claims, max is {}",
            batch.id,
            batch.claim_count(),
            insurer.max_batch_size
        );
    }
}

/// Asserts that each (insurer, provider, batch_date) key has one batch
pub fn assert_unique_batch_keys(batches: &[Batch]) {
    let mut seen = HashMap::new();
    for batch in batches {
        if let Some(other) = seen.insert(batch.key(), batch.id) {
            panic!("Batches {} and {} share a key", other, batch.id);
        }
    }
}
