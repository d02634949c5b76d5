//! Daily claim batches

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BatchId, ClaimId, Currency, InsurerId, Money, MoneyError, ProviderId};

/// The unique key of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchKey {
    pub insurer_id: InsurerId,
    pub provider_id: ProviderId,
    pub batch_date: NaiveDate,
}

impl BatchKey {
    pub fn new(insurer_id: InsurerId, provider_id: ProviderId, batch_date: NaiveDate) -> Self {
        Self {
            insurer_id,
            provider_id,
            batch_date,
        }
    }
}

/// Claims from one provider, grouped for one insurer on one batch_date
///
/// `total_cost` accumulates the `total_amount` of every attached claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub insurer_id: InsurerId,
    pub provider_id: ProviderId,
    pub batch_date: NaiveDate,
    pub total_cost: Money,
    /// Attachment order
    pub claim_ids: Vec<ClaimId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Creates an empty batch for a key
    pub fn new(key: BatchKey, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: BatchId::new_v7(),
            insurer_id: key.insurer_id,
            provider_id: key.provider_id,
            batch_date: key.batch_date,
            total_cost: Money::zero(currency),
            claim_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> BatchKey {
        BatchKey::new(self.insurer_id, self.provider_id, self.batch_date)
    }

    pub fn claim_count(&self) -> usize {
        self.claim_ids.len()
    }

    pub fn contains(&self, claim_id: &ClaimId) -> bool {
        self.claim_ids.contains(claim_id)
    }

    /// Attaches a claim and adds its amount to the total
    ///
    /// Attaching a claim that is already a member changes nothing and
    /// returns false.
    pub fn attach(&mut self, claim_id: ClaimId, amount: Money) -> Result<bool, MoneyError> {
        if self.contains(&claim_id) {
            return Ok(false);
        }
        self.total_cost = self.total_cost.checked_add(&amount)?;
        self.claim_ids.push(claim_id);
        self.updated_at = Utc::now();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn key() -> BatchKey {
        BatchKey::new(
            InsurerId::new(),
            ProviderId::new(),
            NaiveDate::from_ymd_opt(2025, 6, 21).unwrap(),
        )
    }

    #[test]
    fn test_attach_accumulates_total() {
        let mut batch = Batch::new(key(), Currency::USD);
        assert!(batch.attach(ClaimId::new(), Money::usd(dec!(100))).unwrap());
        assert!(batch.attach(ClaimId::new(), Money::usd(dec!(250.50))).unwrap());

        assert_eq!(batch.claim_count(), 2);
        assert_eq!(batch.total_cost.amount(), dec!(350.50));
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut batch = Batch::new(key(), Currency::USD);
        let claim_id = ClaimId::new();
        batch.attach(claim_id, Money::usd(dec!(100))).unwrap();

        assert!(!batch.attach(claim_id, Money::usd(dec!(100))).unwrap());
        assert_eq!(batch.claim_count(), 1);
        assert_eq!(batch.total_cost.amount(), dec!(100));
    }

    #[test]
    fn test_key_round_trip() {
        let key = key();
        assert_eq!(Batch::new(key, Currency::USD).key(), key);
    }
}
