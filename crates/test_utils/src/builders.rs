//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use chrono::{NaiveDate, Utc};
use fake::faker::company::en::CompanyName;
use fake::Fake;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{ClaimId, InsurerId, Money, ProviderId};
use domain_claims::{Claim, ClaimItem, ClaimSubmission, Insurer, ItemSubmission, Provider};

use crate::fixtures::DateFixtures;

/// Builder for claims
///
/// Without explicit items the claim carries one item priced at the amount.
#[derive(Debug, Clone)]
pub struct ClaimBuilder {
    id: ClaimId,
    provider_id: ProviderId,
    insurer_id: InsurerId,
    encounter_date: NaiveDate,
    submission_date: NaiveDate,
    specialty: String,
    priority_level: u8,
    amount: Decimal,
    items: Option<Vec<ClaimItem>>,
}

impl ClaimBuilder {
    /// Creates a builder for a claim against `insurer`
    pub fn new(insurer: &Insurer) -> Self {
        Self {
            id: ClaimId::new_v7(),
            provider_id: ProviderId::new_v7(),
            insurer_id: insurer.id,
            encounter_date: DateFixtures::mid_month(),
            submission_date: DateFixtures::mid_month(),
            specialty: "cardiology".to_string(),
            priority_level: 3,
            amount: dec!(1000),
            items: None,
        }
    }

    fn with_id(mut self, id: ClaimId) -> Self {
        self.id = id;
        self
    }

    pub fn with_provider(mut self, provider_id: ProviderId) -> Self {
        self.provider_id = provider_id;
        self
    }

    /// Sets both encounter and submission date
    pub fn on(mut self, date: NaiveDate) -> Self {
        self.encounter_date = date;
        self.submission_date = date;
        self
    }

    pub fn with_encounter_date(mut self, date: NaiveDate) -> Self {
        self.encounter_date = date;
        self
    }

    pub fn with_submission_date(mut self, date: NaiveDate) -> Self {
        self.submission_date = date;
        self
    }

    pub fn with_specialty(mut self, specialty: impl Into<String>) -> Self {
        self.specialty = specialty.into();
        self
    }

    pub fn with_priority(mut self, priority_level: u8) -> Self {
        self.priority_level = priority_level;
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = amount;
        self
    }

    /// Uses these items; the amount becomes their subtotal sum
    pub fn with_items(mut self, items: Vec<ClaimItem>) -> Self {
        self.amount = items.iter().map(|i| i.subtotal.amount()).sum();
        self.items = Some(items);
        self
    }

    pub fn build(self) -> Claim {
        let items = self
            .items
            .unwrap_or_else(|| vec![ClaimItem::new("Consultation", Money::usd(self.amount), 1)]);
        Claim {
            id: self.id,
            provider_id: self.provider_id,
            insurer_id: self.insurer_id,
            encounter_date: self.encounter_date,
            submission_date: self.submission_date,
            specialty: self.specialty,
            priority_level: self.priority_level,
            total_amount: Money::usd(self.amount),
            items,
            created_at: Utc::now(),
        }
    }

    /// Builds `count` claims that differ only in id
    pub fn build_many(self, count: usize) -> Vec<Claim> {
        (0..count)
            .map(|_| self.clone().with_id(ClaimId::new_v7()).build())
            .collect()
    }
}

/// Builder for insurer policies
#[derive(Debug, Clone)]
pub struct InsurerBuilder {
    insurer: Insurer,
}

impl InsurerBuilder {
    /// Starts from an existing insurer under a fresh id
    pub fn based_on(insurer: Insurer) -> Self {
        Self {
            insurer: Insurer {
                id: InsurerId::new_v7(),
                ..insurer
            },
        }
    }

    pub fn with_batch_sizes(mut self, min: u32, max: u32) -> Self {
        self.insurer.min_batch_size = min;
        self.insurer.max_batch_size = max;
        self
    }

    pub fn with_daily_capacity(mut self, capacity: u32) -> Self {
        self.insurer.daily_capacity = capacity;
        self
    }

    pub fn with_email(mut self, email: Option<&str>) -> Self {
        self.insurer.email = email.map(str::to_string);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.insurer.code = code.into();
        self
    }

    pub fn build(self) -> Insurer {
        self.insurer
    }
}

/// A provider with a generated company name
pub fn random_provider() -> Provider {
    let name: String = CompanyName().fake();
    Provider::new(name)
}

/// Builder for claim submissions
#[derive(Debug, Clone)]
pub struct SubmissionBuilder {
    submission: ClaimSubmission,
}

impl SubmissionBuilder {
    pub fn new(insurer_code: &str) -> Self {
        Self {
            submission: ClaimSubmission {
                provider_name: "Downtown Medical Group".to_string(),
                insurer_code: insurer_code.to_string(),
                encounter_date: DateFixtures::mid_month(),
                submission_date: DateFixtures::mid_month(),
                specialty: "Cardiology".to_string(),
                priority_level: 3,
                items: vec![ItemSubmission {
                    name: "Consultation".to_string(),
                    unit_price: dec!(150),
                    quantity: 2,
                }],
            },
        }
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.submission.provider_name = name.into();
        self
    }

    pub fn with_priority(mut self, priority_level: u8) -> Self {
        self.submission.priority_level = priority_level;
        self
    }

    pub fn with_items(mut self, items: Vec<ItemSubmission>) -> Self {
        self.submission.items = items;
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.submission.encounter_date = date;
        self.submission.submission_date = date;
        self
    }

    pub fn build(self) -> ClaimSubmission {
        self.submission
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::InsurerFixtures;

    #[test]
    fn test_claim_builder_defaults() {
        let insurer = InsurerFixtures::insurer_a();
        let claim = ClaimBuilder::new(&insurer).build();
        assert_eq!(claim.insurer_id, insurer.id);
        assert_eq!(claim.total_amount.amount(), dec!(1000));
        assert_eq!(claim.items.len(), 1);
    }

    #[test]
    fn test_build_many_distinct_ids() {
        let claims = ClaimBuilder::new(&InsurerFixtures::insurer_a()).build_many(5);
        let mut ids: Vec<ClaimId> = claims.iter().map(|c| c.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_random_provider_has_name() {
        assert!(!random_provider().name.is_empty());
    }
}
