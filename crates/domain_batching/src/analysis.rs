//! Cost analysis over every claim of an insurer
//!
//! Read only. Buckets processing costs by specialty, priority, submission
//! month and provider, and flags:
//!
//! - a specialty whose average cost exceeds 1.5x the overall average per claim
//! - a priority 1 or 2 bucket holding more than 10 claims

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use core_kernel::{round_half_up, ProviderId};
use domain_claims::{Claim, Insurer};

use crate::cost::processing_cost;
use crate::error::BatchingError;
use crate::ports::{ClaimStore, ProviderStore};

const HIGH_COST_FACTOR: Decimal = dec!(1.5);
const HIGH_PRIORITY_COUNT: usize = 10;

/// Aggregated cost of one bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBucket {
    pub count: usize,
    pub total_cost: Decimal,
    /// Share of the insurer's total processing cost, in percent
    pub percentage: Decimal,
    pub average_cost: Decimal,
}

/// Something in the cost analysis worth a closer look
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CostOpportunity {
    HighCostSpecialty {
        specialty: String,
        average_cost: Decimal,
        recommendation: String,
    },
    HighPriorityVolume {
        priority: u8,
        count: usize,
        recommendation: String,
    },
}

/// Cost analysis of one insurer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostAnalysis {
    pub total_claims: usize,
    pub total_processing_cost: Decimal,
    pub average_cost_per_claim: Decimal,
    pub cost_by_specialty: BTreeMap<String, CostBucket>,
    pub cost_by_priority: BTreeMap<u8, CostBucket>,
    /// Keyed by submission month, `YYYY-MM`
    pub cost_by_month: BTreeMap<String, CostBucket>,
    /// Keyed by provider name
    pub cost_by_provider: BTreeMap<String, CostBucket>,
    pub optimization_opportunities: Vec<CostOpportunity>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    count: usize,
    total: Decimal,
}

fn tally<K: Ord>(group: &mut BTreeMap<K, Tally>, key: K, cost: Decimal) {
    let entry = group.entry(key).or_default();
    entry.count += 1;
    entry.total += cost;
}

/// Buckets are empty when the total cost is zero
fn format_buckets<K: Ord>(group: BTreeMap<K, Tally>, total_cost: Decimal) -> BTreeMap<K, CostBucket> {
    if total_cost.is_zero() {
        return BTreeMap::new();
    }
    group
        .into_iter()
        .map(|(key, t)| {
            let bucket = CostBucket {
                count: t.count,
                total_cost: round_half_up(t.total, 2),
                percentage: round_half_up(t.total / total_cost * dec!(100), 2),
                average_cost: round_half_up(t.total / Decimal::from(t.count), 2),
            };
            (key, bucket)
        })
        .collect()
}

/// Builds the analysis from already loaded claims
///
/// `provider_names` maps provider ids to display names; unknown providers
/// are keyed by their id.
pub fn build_cost_analysis(
    claims: &[Claim],
    insurer: &Insurer,
    provider_names: &HashMap<ProviderId, String>,
) -> CostAnalysis {
    if claims.is_empty() {
        return CostAnalysis::default();
    }

    let mut total_cost = Decimal::ZERO;
    let mut by_specialty = BTreeMap::new();
    let mut by_priority = BTreeMap::new();
    let mut by_month = BTreeMap::new();
    let mut by_provider = BTreeMap::new();

    for claim in claims {
        let cost = processing_cost(claim, insurer);
        total_cost += cost;

        tally(&mut by_specialty, claim.specialty.clone(), cost);
        tally(&mut by_priority, claim.priority_level, cost);
        tally(&mut by_month, claim.submission_date.format("%Y-%m").to_string(), cost);
        let provider = provider_names
            .get(&claim.provider_id)
            .cloned()
            .unwrap_or_else(|| claim.provider_id.to_string());
        tally(&mut by_provider, provider, cost);
    }

    let average = total_cost / Decimal::from(claims.len());
    let cost_by_specialty = format_buckets(by_specialty, total_cost);
    let cost_by_priority = format_buckets(by_priority, total_cost);
    let optimization_opportunities =
        find_opportunities(&cost_by_specialty, &cost_by_priority, average);

    CostAnalysis {
        total_claims: claims.len(),
        total_processing_cost: round_half_up(total_cost, 2),
        average_cost_per_claim: round_half_up(average, 2),
        cost_by_specialty,
        cost_by_priority,
        cost_by_month: format_buckets(by_month, total_cost),
        cost_by_provider: format_buckets(by_provider, total_cost),
        optimization_opportunities,
    }
}

fn find_opportunities(
    by_specialty: &BTreeMap<String, CostBucket>,
    by_priority: &BTreeMap<u8, CostBucket>,
    average_cost: Decimal,
) -> Vec<CostOpportunity> {
    let threshold = average_cost * HIGH_COST_FACTOR;

    let specialties = by_specialty
        .iter()
        .filter(|(_, bucket)| bucket.average_cost > threshold)
        .map(|(specialty, bucket)| CostOpportunity::HighCostSpecialty {
            specialty: specialty.clone(),
            average_cost: bucket.average_cost,
            recommendation: format!("Consider optimizing processing for {} claims", specialty),
        });

    let priorities = by_priority
        .iter()
        .filter(|(priority, bucket)| **priority <= 2 && bucket.count > HIGH_PRIORITY_COUNT)
        .map(|(priority, bucket)| CostOpportunity::HighPriorityVolume {
            priority: *priority,
            count: bucket.count,
            recommendation: format!(
                "High volume of priority {} claims. Consider reviewing priority assignment.",
                priority
            ),
        });

    specialties.chain(priorities).collect()
}

/// Loads an insurer's claims and provider names and runs the analysis
#[derive(Clone)]
pub struct CostAnalyzer {
    claims: Arc<dyn ClaimStore>,
    providers: Arc<dyn ProviderStore>,
}

impl CostAnalyzer {
    pub fn new(claims: Arc<dyn ClaimStore>, providers: Arc<dyn ProviderStore>) -> Self {
        Self { claims, providers }
    }

    #[instrument(skip(self, insurer), fields(insurer_id = %insurer.id))]
    pub async fn analyze(&self, insurer: &Insurer) -> Result<CostAnalysis, BatchingError> {
        let claims = self.claims.claims_for_insurer(insurer.id).await?;

        let mut provider_names = HashMap::new();
        for claim in &claims {
            if provider_names.contains_key(&claim.provider_id) {
                continue;
            }
            let provider = self.providers.get_provider(claim.provider_id).await?;
            provider_names.insert(provider.id, provider.name);
        }

        Ok(build_cost_analysis(&claims, insurer, &provider_names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::{ClaimId, InsurerId, Money};
    use domain_claims::DatePreference;

    fn insurer() -> Insurer {
        Insurer {
            id: InsurerId::new(),
            name: "Insurer C".to_string(),
            code: "INS-C".to_string(),
            email: None,
            date_preference: DatePreference::Encounter,
            specialty_preferences: BTreeMap::from([("neurology".to_string(), dec!(0.9))]),
            min_batch_size: 2,
            max_batch_size: 20,
            daily_capacity: 75,
        }
    }

    fn claim(provider_id: ProviderId, specialty: &str, priority: u8, day: u32) -> Claim {
        let date = NaiveDate::from_ymd_opt(2025, 5, day).unwrap();
        Claim {
            id: ClaimId::new(),
            provider_id,
            insurer_id: InsurerId::new(),
            encounter_date: date,
            submission_date: date,
            specialty: specialty.to_string(),
            priority_level: priority,
            total_amount: Money::usd(dec!(500)),
            items: Vec::new(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_empty_analysis() {
        let analysis = build_cost_analysis(&[], &insurer(), &HashMap::new());
        assert_eq!(analysis.total_claims, 0);
        assert!(analysis.cost_by_specialty.is_empty());
        assert!(analysis.optimization_opportunities.is_empty());
    }

    #[test]
    fn test_buckets_and_percentages() {
        let provider = ProviderId::new();
        let names = HashMap::from([(provider, "Clinic".to_string())]);
        // neurology: 100 x 1.2 x 1.1 x 1.0 = 132.00
        // dermatology: 100 x 1.2 x 1.25 x 1.0 = 150.00
        let claims = vec![
            claim(provider, "Neurology", 5, 1),
            claim(provider, "Dermatology", 5, 1),
        ];

        let analysis = build_cost_analysis(&claims, &insurer(), &names);

        assert_eq!(analysis.total_processing_cost, dec!(282.00));
        assert_eq!(analysis.average_cost_per_claim, dec!(141.00));
        assert_eq!(analysis.cost_by_specialty["Neurology"].percentage, dec!(46.81));
        assert_eq!(analysis.cost_by_specialty["Dermatology"].percentage, dec!(53.19));
        assert_eq!(analysis.cost_by_month["2025-05"].count, 2);
        assert_eq!(analysis.cost_by_provider["Clinic"].total_cost, dec!(282.00));
        assert!(analysis.optimization_opportunities.is_empty());
    }

    #[test]
    fn test_high_priority_volume_is_absolute() {
        let provider = ProviderId::new();
        let mut claims: Vec<Claim> = (0..11).map(|_| claim(provider, "Neurology", 2, 3)).collect();
        claims.extend((0..40).map(|_| claim(provider, "Neurology", 5, 3)));

        let analysis = build_cost_analysis(&claims, &insurer(), &HashMap::new());

        assert!(analysis.optimization_opportunities.iter().any(|o| matches!(
            o,
            CostOpportunity::HighPriorityVolume { priority: 2, count: 11, .. }
        )));
    }

    #[test]
    fn test_high_cost_specialty_against_overall_average() {
        let provider = ProviderId::new();
        let mut claims: Vec<Claim> = (0..8).map(|_| claim(provider, "Neurology", 5, 1)).collect();
        claims.push(claim(provider, "Oncology", 1, 30));

        let analysis = build_cost_analysis(&claims, &insurer(), &HashMap::new());

        let flagged: Vec<&CostOpportunity> = analysis
            .optimization_opportunities
            .iter()
            .filter(|o| matches!(o, CostOpportunity::HighCostSpecialty { .. }))
            .collect();
        assert_eq!(flagged.len(), 1);
        assert!(matches!(
            flagged[0],
            CostOpportunity::HighCostSpecialty { specialty, .. } if specialty == "Oncology"
        ));
    }

    #[test]
    fn test_opportunities_carry_a_recommendation() {
        let provider = ProviderId::new();
        let claims: Vec<Claim> = (0..11).map(|_| claim(provider, "Neurology", 1, 3)).collect();

        let analysis = build_cost_analysis(&claims, &insurer(), &HashMap::new());
        let json = serde_json::to_value(&analysis.optimization_opportunities[0]).unwrap();

        assert_eq!(json["type"], "high_priority_volume");
        assert_eq!(json["priority"], 1);
        assert!(json["recommendation"].as_str().unwrap().contains("priority 1"));
        assert!(json.get("suggestion").is_none());
    }
}
