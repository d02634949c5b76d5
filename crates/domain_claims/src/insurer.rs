//! Insurer batching policy

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::InsurerId;
use crate::claim::Claim;
use crate::error::ClaimError;

/// Which claim date drives batching for an insurer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DatePreference {
    #[default]
    Encounter,
    Submission,
}

impl DatePreference {
    /// Picks the claim date this preference refers to
    pub fn relevant_date(&self, claim: &Claim) -> NaiveDate {
        match self {
            DatePreference::Encounter => claim.encounter_date,
            DatePreference::Submission => claim.submission_date,
        }
    }

    /// Name of the claim column this preference refers to
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePreference::Encounter => "encounter",
            DatePreference::Submission => "submission",
        }
    }
}

impl fmt::Display for DatePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatePreference {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "encounter" | "encounter_date" => Ok(DatePreference::Encounter),
            "submission" | "submission_date" => Ok(DatePreference::Submission),
            other => Err(ClaimError::InvalidDatePreference(other.to_string())),
        }
    }
}

/// Batches are dated the day before the relevant claim date
pub fn batch_date_from(relevant_date: NaiveDate) -> NaiveDate {
    relevant_date.pred_opt().unwrap_or(NaiveDate::MIN)
}

/// An insurer and the policy it imposes on batching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insurer {
    pub id: InsurerId,
    pub name: String,
    pub code: String,
    /// Batch-ready notifications go here; none means no notification
    pub email: Option<String>,
    pub date_preference: DatePreference,
    /// Lowercase specialty name to efficiency in [0, 1]
    pub specialty_preferences: BTreeMap<String, Decimal>,
    pub min_batch_size: u32,
    pub max_batch_size: u32,
    /// Maximum claims across all providers for one batch_date
    pub daily_capacity: u32,
}

impl Insurer {
    /// The claim date that drives batching for this insurer
    pub fn relevant_date(&self, claim: &Claim) -> NaiveDate {
        self.date_preference.relevant_date(claim)
    }

    /// The batch_date a claim lands in for this insurer
    pub fn batch_date_for(&self, claim: &Claim) -> NaiveDate {
        batch_date_from(self.relevant_date(claim))
    }

    /// Declared efficiency for a specialty, matched case-insensitively
    pub fn efficiency_for(&self, specialty: &str) -> Option<Decimal> {
        self.specialty_preferences
            .get(&specialty.to_lowercase())
            .copied()
    }

    /// Checks the size bounds and efficiency range
    pub fn validate(&self) -> Result<(), ClaimError> {
        if self.min_batch_size == 0 {
            return Err(ClaimError::InvalidInsurerPolicy {
                field: "min_batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_batch_size < self.min_batch_size {
            return Err(ClaimError::InvalidInsurerPolicy {
                field: "max_batch_size",
                reason: format!(
                    "{} is below min_batch_size {}",
                    self.max_batch_size, self.min_batch_size
                ),
            });
        }
        if let Some((specialty, efficiency)) = self
            .specialty_preferences
            .iter()
            .find(|(_, e)| **e < Decimal::ZERO || **e > Decimal::ONE)
        {
            return Err(ClaimError::InvalidInsurerPolicy {
                field: "specialty_preferences",
                reason: format!("efficiency {} for '{}' is outside [0, 1]", efficiency, specialty),
            });
        }
        Ok(())
    }
}
