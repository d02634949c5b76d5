//! Insurer DTOs

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::InsurerId;
use domain_claims::{Batch, Claim, DatePreference, Insurer};

#[derive(Debug, Serialize)]
pub struct InsurerSummary {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

impl From<&Insurer> for InsurerSummary {
    fn from(insurer: &Insurer) -> Self {
        Self {
            id: *insurer.id.as_uuid(),
            name: insurer.name.clone(),
            code: insurer.code.clone(),
        }
    }
}

fn default_min_batch_size() -> u32 {
    1
}

fn default_max_batch_size() -> u32 {
    10
}

fn default_daily_capacity() -> u32 {
    100
}

/// Efficiencies are looked up by lowercase specialty
fn normalize_preferences(preferences: BTreeMap<String, Decimal>) -> BTreeMap<String, Decimal> {
    preferences
        .into_iter()
        .map(|(specialty, efficiency)| (specialty.trim().to_lowercase(), efficiency))
        .collect()
}

/// Body of an insurer create request
///
/// Policy fields left out take the defaults: batch sizes 1 to 10 and a
/// daily capacity of 100.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInsurerRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub date_preference: DatePreference,
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
    #[serde(default)]
    pub specialty_preferences: BTreeMap<String, Decimal>,
    #[serde(default = "default_min_batch_size")]
    pub min_batch_size: u32,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: u32,
    #[serde(default = "default_daily_capacity")]
    pub daily_capacity: u32,
}

impl CreateInsurerRequest {
    pub fn into_insurer(self) -> Insurer {
        Insurer {
            id: InsurerId::new_v7(),
            name: self.name,
            code: self.code,
            email: self.email,
            date_preference: self.date_preference,
            specialty_preferences: normalize_preferences(self.specialty_preferences),
            min_batch_size: self.min_batch_size,
            max_batch_size: self.max_batch_size,
            daily_capacity: self.daily_capacity,
        }
    }
}

/// Body of an insurer update; absent fields keep their stored value
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateInsurerRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub code: Option<String>,
    pub date_preference: Option<DatePreference>,
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
    pub specialty_preferences: Option<BTreeMap<String, Decimal>>,
    pub min_batch_size: Option<u32>,
    pub max_batch_size: Option<u32>,
    pub daily_capacity: Option<u32>,
}

impl UpdateInsurerRequest {
    pub fn apply(self, mut insurer: Insurer) -> Insurer {
        if let Some(name) = self.name {
            insurer.name = name;
        }
        if let Some(code) = self.code {
            insurer.code = code;
        }
        if let Some(date_preference) = self.date_preference {
            insurer.date_preference = date_preference;
        }
        if let Some(email) = self.email {
            insurer.email = Some(email);
        }
        if let Some(preferences) = self.specialty_preferences {
            insurer.specialty_preferences = normalize_preferences(preferences);
        }
        if let Some(min) = self.min_batch_size {
            insurer.min_batch_size = min;
        }
        if let Some(max) = self.max_batch_size {
            insurer.max_batch_size = max;
        }
        if let Some(capacity) = self.daily_capacity {
            insurer.daily_capacity = capacity;
        }
        insurer
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// A batch together with its claims
#[derive(Debug, Serialize)]
pub struct BatchDetailsResponse {
    pub batch: Batch,
    pub claims: Vec<Claim>,
}

/// Body of an optimize request; the date defaults to today
#[derive(Debug, Default, Deserialize)]
pub struct OptimizeRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_create_request_fills_policy_defaults() {
        let request: CreateInsurerRequest = serde_json::from_value(json!({
            "name": "Insurer E",
            "code": "INS-E",
            "date_preference": "submission",
            "specialty_preferences": { "Cardiology": "0.75" }
        }))
        .unwrap();

        let insurer = request.into_insurer();

        assert_eq!((insurer.min_batch_size, insurer.max_batch_size), (1, 10));
        assert_eq!(insurer.daily_capacity, 100);
        assert_eq!(insurer.efficiency_for("cardiology"), Some(dec!(0.75)));
        assert!(insurer.validate().is_ok());
    }

    #[test]
    fn test_update_keeps_absent_fields() {
        let original = CreateInsurerRequest {
            name: "Insurer E".to_string(),
            code: "INS-E".to_string(),
            date_preference: DatePreference::Encounter,
            email: None,
            specialty_preferences: BTreeMap::new(),
            min_batch_size: 2,
            max_batch_size: 8,
            daily_capacity: 40,
        }
        .into_insurer();

        let updated = UpdateInsurerRequest {
            max_batch_size: Some(12),
            ..UpdateInsurerRequest::default()
        }
        .apply(original.clone());

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.min_batch_size, 2);
        assert_eq!(updated.max_batch_size, 12);
        assert_eq!(updated.code, "INS-E");
    }

    #[test]
    fn test_email_must_be_an_address() {
        let request = UpdateInsurerRequest {
            email: Some("not-an-address".to_string()),
            ..UpdateInsurerRequest::default()
        };
        assert!(request.validate().is_err());
    }
}
