//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{ClaimId, InsurerId, Money, ProviderId};
use domain_claims::{Claim, DatePreference, Insurer};

use crate::fixtures::SPECIALTIES;

/// Strategy for priority levels 1 to 5
pub fn priority_strategy() -> impl Strategy<Value = u8> {
    1u8..=5u8
}

/// Strategy for claim amounts between 0.01 and 100,000.00
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for efficiencies in [0, 1] with two decimal places
fn efficiency_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=100i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for any day of 2025
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (1u32..=365u32).prop_map(|ordinal| {
        NaiveDate::from_yo_opt(2025, ordinal).unwrap_or(NaiveDate::MIN)
    })
}

/// Strategy for specialties, including one no reference insurer knows
pub fn specialty_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        proptest::sample::select(SPECIALTIES.to_vec()).prop_map(str::to_string),
        Just("Dermatology".to_string()),
        Just("CARDIOLOGY".to_string()),
    ]
}

/// Strategy for insurers with a valid batching policy
pub fn insurer_strategy() -> impl Strategy<Value = Insurer> {
    (
        prop_oneof![Just(DatePreference::Encounter), Just(DatePreference::Submission)],
        1u32..=6u32,
        0u32..=20u32,
        0u32..=80u32,
        proptest::collection::vec(efficiency_strategy(), SPECIALTIES.len()),
    )
        .prop_map(|(date_preference, min, extra, capacity, efficiencies)| Insurer {
            id: InsurerId::new_v7(),
            name: "Generated Insurer".to_string(),
            code: "INS-GEN".to_string(),
            email: None,
            date_preference,
            specialty_preferences: SPECIALTIES
                .iter()
                .map(|s| s.to_string())
                .zip(efficiencies)
                .collect::<BTreeMap<_, _>>(),
            min_batch_size: min,
            max_batch_size: min + extra,
            daily_capacity: capacity,
        })
}

/// Strategy for one claim of `insurer_id` from one of `providers`, on `date`
pub fn claim_strategy(
    insurer_id: InsurerId,
    providers: Vec<ProviderId>,
    date: NaiveDate,
) -> impl Strategy<Value = Claim> {
    (
        proptest::sample::select(providers),
        specialty_strategy(),
        priority_strategy(),
        amount_strategy(),
    )
        .prop_map(move |(provider_id, specialty, priority_level, amount)| Claim {
            id: ClaimId::new_v7(),
            provider_id,
            insurer_id,
            encounter_date: date,
            submission_date: date,
            specialty,
            priority_level,
            total_amount: Money::usd(amount),
            items: Vec::new(),
            created_at: Utc::now(),
        })
}
