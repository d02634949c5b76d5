//! Processing cost model
//!
//! Every claim is priced as
//!
//! ```text
//! cost = round2(100 x time x specialty x priority x value)
//! ```
//!
//! where each multiplier depends on one property of the claim (and, for
//! specialty, on the insurer's declared efficiency). Costs are plain
//! decimals, not [`core_kernel::Money`]: they are a synthetic processing
//! measure rather than an amount owed.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::round_half_up;
use domain_claims::{Claim, Insurer};

/// Cost of processing a claim before any multiplier
pub const BASE_COST: Decimal = dec!(100);

/// Used as-is when the insurer declares no efficiency for the specialty
pub const DEFAULT_SPECIALTY_MULTIPLIER: Decimal = dec!(1.25);

/// The factors that make up one claim's processing cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub base: Decimal,
    pub time_multiplier: Decimal,
    pub specialty_multiplier: Decimal,
    pub priority_multiplier: Decimal,
    pub value_multiplier: Decimal,
    pub total: Decimal,
}

/// Later in the month costs more: 1.2 on the 1st, 1.5 on the 30th
///
/// Not clamped, so the 31st lands slightly above 1.5.
pub fn time_multiplier(submission_date: NaiveDate) -> Decimal {
    let day = Decimal::from(submission_date.day());
    round_half_up(
        dec!(1.2) + (day - Decimal::ONE) / dec!(29) * dec!(0.3),
        3,
    )
}

pub fn specialty_multiplier(insurer: &Insurer, specialty: &str) -> Decimal {
    match insurer.efficiency_for(specialty) {
        Some(efficiency) => dec!(2.0) - efficiency,
        None => DEFAULT_SPECIALTY_MULTIPLIER,
    }
}

pub fn priority_multiplier(priority_level: u8) -> Decimal {
    match priority_level {
        1 => dec!(2.0),
        2 => dec!(1.6),
        3 => dec!(1.3),
        4 => dec!(1.1),
        5 => dec!(1.0),
        _ => dec!(1.0),
    }
}

/// Step function over the claim amount
pub fn value_multiplier(total_amount: Decimal) -> Decimal {
    if total_amount <= dec!(1000) {
        dec!(1.0)
    } else if total_amount <= dec!(5000) {
        dec!(1.2)
    } else if total_amount <= dec!(10000) {
        dec!(1.4)
    } else if total_amount <= dec!(25000) {
        dec!(1.6)
    } else {
        dec!(2.0)
    }
}

/// Prices a claim for an insurer and keeps each factor
pub fn cost_breakdown(claim: &Claim, insurer: &Insurer) -> CostBreakdown {
    let time = time_multiplier(claim.submission_date);
    let specialty = specialty_multiplier(insurer, &claim.specialty);
    let priority = priority_multiplier(claim.priority_level);
    let value = value_multiplier(claim.total_amount.amount());

    CostBreakdown {
        base: BASE_COST,
        time_multiplier: time,
        specialty_multiplier: specialty,
        priority_multiplier: priority,
        value_multiplier: value,
        total: round_half_up(BASE_COST * time * specialty * priority * value, 2),
    }
}

/// Processing cost of one claim, rounded to cents
pub fn processing_cost(claim: &Claim, insurer: &Insurer) -> Decimal {
    cost_breakdown(claim, insurer).total
}

/// Sum of the per-claim costs, rounded to cents
pub fn batch_processing_cost<'a, I>(claims: I, insurer: &Insurer) -> Decimal
where
    I: IntoIterator<Item = &'a Claim>,
{
    let total: Decimal = claims
        .into_iter()
        .map(|claim| processing_cost(claim, insurer))
        .sum();
    round_half_up(total, 2)
}
