//! Incoming claim submissions

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, InsurerId, Money, ProviderId};
use crate::claim::{Claim, ClaimItem, LEAST_URGENT_PRIORITY, MOST_URGENT_PRIORITY};
use crate::error::ClaimError;

/// A billed line as submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSubmission {
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

/// A claim as submitted by a provider, before insurer and provider resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSubmission {
    pub provider_name: String,
    pub insurer_code: String,
    pub encounter_date: NaiveDate,
    pub submission_date: NaiveDate,
    pub specialty: String,
    pub priority_level: u8,
    pub items: Vec<ItemSubmission>,
}

impl ClaimSubmission {
    pub fn validate(&self) -> Result<(), ClaimError> {
        if self.provider_name.trim().is_empty() {
            return Err(ClaimError::MissingField("provider_name"));
        }
        if self.insurer_code.trim().is_empty() {
            return Err(ClaimError::MissingField("insurer_code"));
        }
        if self.specialty.trim().is_empty() {
            return Err(ClaimError::MissingField("specialty"));
        }
        if !(MOST_URGENT_PRIORITY..=LEAST_URGENT_PRIORITY).contains(&self.priority_level) {
            return Err(ClaimError::InvalidPriority(self.priority_level));
        }
        if self.items.is_empty() {
            return Err(ClaimError::NoItems);
        }
        for item in &self.items {
            let invalid = |reason: &str| ClaimError::InvalidItem {
                name: item.name.clone(),
                reason: reason.to_string(),
            };
            if item.name.trim().is_empty() {
                return Err(invalid("name must not be empty"));
            }
            if item.unit_price.is_sign_negative() && !item.unit_price.is_zero() {
                return Err(invalid("unit_price must not be negative"));
            }
            if item.quantity == 0 {
                return Err(invalid("quantity must be at least 1"));
            }
        }
        Ok(())
    }

    /// Validates and builds the claim for resolved provider and insurer
    pub fn into_claim(
        self,
        provider_id: ProviderId,
        insurer_id: InsurerId,
    ) -> Result<Claim, ClaimError> {
        self.validate()?;

        let items = self
            .items
            .into_iter()
            .map(|item| {
                ClaimItem::new(
                    item.name,
                    Money::new(item.unit_price, Currency::USD),
                    item.quantity,
                )
            })
            .collect();

        Claim::new(
            provider_id,
            insurer_id,
            self.encounter_date,
            self.submission_date,
            self.specialty,
            self.priority_level,
            items,
        )
    }
}
