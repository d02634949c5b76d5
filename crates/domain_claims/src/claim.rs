//! Claim aggregate

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, ClaimItemId, Currency, InsurerId, Money, ProviderId};
use crate::error::ClaimError;

/// Highest urgency a claim can carry
pub const MOST_URGENT_PRIORITY: u8 = 1;
/// Lowest urgency a claim can carry
pub const LEAST_URGENT_PRIORITY: u8 = 5;

/// A billed line on a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimItem {
    pub id: ClaimItemId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    /// unit_price x quantity
    pub subtotal: Money,
}

impl ClaimItem {
    /// Creates an item and computes its subtotal
    pub fn new(name: impl Into<String>, unit_price: Money, quantity: u32) -> Self {
        Self {
            id: ClaimItemId::new_v7(),
            name: name.into(),
            unit_price,
            quantity,
            subtotal: unit_price.multiply(Decimal::from(quantity)),
        }
    }
}

/// A claim submitted by a provider for one insurer
///
/// Claims are immutable once created; batch membership lives on the batch side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub provider_id: ProviderId,
    pub insurer_id: InsurerId,
    pub encounter_date: NaiveDate,
    pub submission_date: NaiveDate,
    /// Free text, matched case-insensitively against insurer preferences
    pub specialty: String,
    /// 1 (most urgent) to 5
    pub priority_level: u8,
    pub total_amount: Money,
    pub items: Vec<ClaimItem>,
    pub created_at: DateTime<Utc>,
}

impl Claim {
    /// Creates a claim whose total is the sum of its item subtotals
    pub fn new(
        provider_id: ProviderId,
        insurer_id: InsurerId,
        encounter_date: NaiveDate,
        submission_date: NaiveDate,
        specialty: impl Into<String>,
        priority_level: u8,
        items: Vec<ClaimItem>,
    ) -> Result<Self, ClaimError> {
        if !(MOST_URGENT_PRIORITY..=LEAST_URGENT_PRIORITY).contains(&priority_level) {
            return Err(ClaimError::InvalidPriority(priority_level));
        }
        if items.is_empty() {
            return Err(ClaimError::NoItems);
        }

        let currency = items
            .first()
            .map(|item| item.subtotal.currency())
            .unwrap_or(Currency::USD);
        let total_amount = Money::sum(currency, items.iter().map(|item| &item.subtotal))?;

        Ok(Self {
            id: ClaimId::new_v7(),
            provider_id,
            insurer_id,
            encounter_date,
            submission_date,
            specialty: specialty.into(),
            priority_level,
            total_amount,
            items,
            created_at: Utc::now(),
        })
    }

    /// Returns true for priority 1 and 2 claims
    pub fn is_high_priority(&self) -> bool {
        self.priority_level <= 2
    }

    /// Number of line items
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
