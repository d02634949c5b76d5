//! Recommendations over an insurer's unbatched claims
//!
//! Uses its own baselines, separate from [`crate::analysis`]:
//!
//! - a specialty is flagged when its average cost exceeds 1.2x the mean of
//!   all per-specialty averages
//! - high priority volume is flagged when priority 1 and 2 claims make up
//!   more than 30% of the unbatched claims

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use core_kernel::round_half_up;
use domain_claims::{Claim, Insurer};

use crate::cost::batch_processing_cost;
use crate::error::BatchingError;
use crate::ports::{BatchStore, ClaimStore};

const SPECIALTY_FACTOR: Decimal = dec!(1.2);
const HIGH_PRIORITY_SHARE: Decimal = dec!(0.3);

/// Something in the unbatched claims worth a closer look
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizationOpportunity {
    HighCostSpecialty {
        specialty: String,
        average_cost: Decimal,
        suggestion: String,
    },
    HighPriorityVolume {
        count: usize,
        /// Share of the unbatched claims, in percent
        percentage: Decimal,
        suggestion: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationAnalysis {
    pub optimization_opportunities: Vec<OptimizationOpportunity>,
}

/// Batching recommendations for one insurer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRecommendations {
    pub total_unbatched_claims: usize,
    pub estimated_total_cost: Decimal,
    pub average_cost_per_claim: Decimal,
    /// Claims batched for today as a percentage of daily capacity
    pub capacity_utilization: Decimal,
    pub analysis: RecommendationAnalysis,
}

/// Percentage of daily capacity already used; 0 when capacity is 0
pub fn capacity_utilization(processed_today: u32, daily_capacity: u32) -> Decimal {
    if daily_capacity == 0 {
        return Decimal::ZERO;
    }
    round_half_up(
        Decimal::from(processed_today) / Decimal::from(daily_capacity) * dec!(100),
        2,
    )
}

/// Builds recommendations from already loaded unbatched claims
pub fn build_recommendations(
    unbatched: &[Claim],
    insurer: &Insurer,
    processed_today: u32,
) -> OptimizationRecommendations {
    let utilization = capacity_utilization(processed_today, insurer.daily_capacity);
    if unbatched.is_empty() {
        return OptimizationRecommendations {
            capacity_utilization: utilization,
            ..OptimizationRecommendations::default()
        };
    }

    let count = Decimal::from(unbatched.len());
    let total_cost = batch_processing_cost(unbatched, insurer);
    let mut opportunities = Vec::new();

    let mut by_specialty: BTreeMap<&str, Vec<&Claim>> = BTreeMap::new();
    for claim in unbatched {
        by_specialty.entry(claim.specialty.as_str()).or_default().push(claim);
    }
    let specialty_averages: Vec<(&str, Decimal)> = by_specialty
        .iter()
        .map(|(specialty, claims)| {
            let cost = batch_processing_cost(claims.iter().copied(), insurer);
            (*specialty, cost / Decimal::from(claims.len()))
        })
        .collect();
    let mean_of_averages = specialty_averages
        .iter()
        .map(|(_, average)| *average)
        .sum::<Decimal>()
        / Decimal::from(specialty_averages.len());

    for (specialty, average) in &specialty_averages {
        if *average > mean_of_averages * SPECIALTY_FACTOR {
            opportunities.push(OptimizationOpportunity::HighCostSpecialty {
                specialty: specialty.to_string(),
                average_cost: round_half_up(*average, 2),
                suggestion: format!(
                    "Review processing for {} as its average cost per claim is significantly above average.",
                    specialty
                ),
            });
        }
    }

    let high_priority = unbatched.iter().filter(|c| c.is_high_priority()).count();
    let share = Decimal::from(high_priority) / count;
    if share > HIGH_PRIORITY_SHARE {
        opportunities.push(OptimizationOpportunity::HighPriorityVolume {
            count: high_priority,
            percentage: round_half_up(share * dec!(100), 2),
            suggestion: "High volume of priority claims. Consider if priorities are assigned correctly."
                .to_string(),
        });
    }

    OptimizationRecommendations {
        total_unbatched_claims: unbatched.len(),
        estimated_total_cost: total_cost,
        average_cost_per_claim: round_half_up(total_cost / count, 2),
        capacity_utilization: utilization,
        analysis: RecommendationAnalysis {
            optimization_opportunities: opportunities,
        },
    }
}

/// Loads unbatched claims and today's usage and builds recommendations
#[derive(Clone)]
pub struct OptimizationAdvisor {
    claims: Arc<dyn ClaimStore>,
    batches: Arc<dyn BatchStore>,
}

impl OptimizationAdvisor {
    pub fn new(claims: Arc<dyn ClaimStore>, batches: Arc<dyn BatchStore>) -> Self {
        Self { claims, batches }
    }

    /// `today` is the batch_date whose usage counts toward capacity utilization
    #[instrument(skip(self, insurer), fields(insurer_id = %insurer.id))]
    pub async fn recommend(
        &self,
        insurer: &Insurer,
        today: NaiveDate,
    ) -> Result<OptimizationRecommendations, BatchingError> {
        let unbatched = self.claims.unbatched_claims(insurer.id).await?;
        let processed_today = self.batches.attached_count(insurer.id, today).await?;
        Ok(build_recommendations(&unbatched, insurer, processed_today))
    }
}
