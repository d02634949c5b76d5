//! Integration tests for domain_claims

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use core_kernel::{ClaimId, Currency, InsurerId, Money, ProviderId};

use domain_claims::batch::{Batch, BatchKey};
use domain_claims::claim::{Claim, ClaimItem};
use domain_claims::insurer::{batch_date_from, DatePreference, Insurer};
use domain_claims::submission::{ClaimSubmission, ItemSubmission};
use domain_claims::ClaimError;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn submission_insurer() -> Insurer {
    Insurer {
        id: InsurerId::new_v7(),
        name: "Insurer B".to_string(),
        code: "INS-B".to_string(),
        email: Some("insurer.b@example.com".to_string()),
        date_preference: DatePreference::Submission,
        specialty_preferences: BTreeMap::from([
            ("cardiology".to_string(), dec!(0.9)),
            ("oncology".to_string(), dec!(0.5)),
        ]),
        min_batch_size: 5,
        max_batch_size: 25,
        daily_capacity: 100,
    }
}

// ============================================================================
// Claim Tests
// ============================================================================

mod claim_tests {
    use super::*;

    #[test]
    fn test_claim_total_with_quantities() {
        let claim = Claim::new(
            ProviderId::new_v7(),
            InsurerId::new_v7(),
            date(2025, 6, 20),
            date(2025, 6, 22),
            "Neurology",
            1,
            vec![
                ClaimItem::new("EEG", Money::usd(dec!(333.33)), 3),
                ClaimItem::new("Consult", Money::usd(dec!(0.01)), 1),
            ],
        )
        .unwrap();

        assert_eq!(claim.total_amount.amount(), dec!(1000.00));
        assert_eq!(claim.total_amount.currency(), Currency::USD);
    }

    #[test]
    fn test_claim_serializes_with_items() {
        let claim = Claim::new(
            ProviderId::new_v7(),
            InsurerId::new_v7(),
            date(2025, 1, 5),
            date(2025, 1, 6),
            "Pediatrics",
            4,
            vec![ClaimItem::new("Checkup", Money::usd(dec!(90)), 1)],
        )
        .unwrap();

        let json = serde_json::to_value(&claim).unwrap();
        assert_eq!(json["specialty"], "Pediatrics");
        assert_eq!(json["priority_level"], 4);
        assert_eq!(json["items"].as_array().map(|a| a.len()), Some(1));
    }
}

// ============================================================================
// Insurer Tests
// ============================================================================

mod insurer_tests {
    use super::*;

    #[test]
    fn test_submission_preference_batches_day_before_submission() {
        let insurer = submission_insurer();
        let claim = Claim::new(
            ProviderId::new_v7(),
            insurer.id,
            date(2025, 6, 1),
            date(2025, 6, 10),
            "Cardiology",
            2,
            vec![ClaimItem::new("Stress test", Money::usd(dec!(500)), 1)],
        )
        .unwrap();

        assert_eq!(insurer.relevant_date(&claim), date(2025, 6, 10));
        assert_eq!(insurer.batch_date_for(&claim), date(2025, 6, 9));
    }

    #[test]
    fn test_batch_date_crosses_year_boundary() {
        assert_eq!(batch_date_from(date(2025, 1, 1)), date(2024, 12, 31));
    }

    #[test]
    fn test_valid_policy_passes() {
        assert!(submission_insurer().validate().is_ok());
    }

    #[test]
    fn test_zero_minimum_rejected() {
        let mut insurer = submission_insurer();
        insurer.min_batch_size = 0;
        assert!(matches!(
            insurer.validate(),
            Err(ClaimError::InvalidInsurerPolicy { .. })
        ));
    }

    #[test]
    fn test_date_preference_serde_names() {
        let json = serde_json::to_string(&DatePreference::Submission).unwrap();
        assert_eq!(json, "\"submission\"");
    }
}

// ============================================================================
// Batch Tests
// ============================================================================

mod batch_tests {
    use super::*;

    #[test]
    fn test_batch_membership() {
        let key = BatchKey::new(InsurerId::new_v7(), ProviderId::new_v7(), date(2025, 6, 21));
        let mut batch = Batch::new(key, Currency::USD);
        let first = ClaimId::new_v7();
        let second = ClaimId::new_v7();

        batch.attach(first, Money::usd(dec!(1200))).unwrap();
        batch.attach(second, Money::usd(dec!(800))).unwrap();
        batch.attach(first, Money::usd(dec!(1200))).unwrap();

        assert_eq!(batch.claim_ids, vec![first, second]);
        assert_eq!(batch.total_cost.amount(), dec!(2000));
    }

    #[test]
    fn test_attach_rejects_other_currency() {
        let key = BatchKey::new(InsurerId::new_v7(), ProviderId::new_v7(), date(2025, 6, 21));
        let mut batch = Batch::new(key, Currency::USD);
        let result = batch.attach(ClaimId::new_v7(), Money::new(dec!(10), Currency::EUR));
        assert!(result.is_err());
        assert_eq!(batch.claim_count(), 0);
    }
}

// ============================================================================
// Submission Tests
// ============================================================================

mod submission_tests {
    use super::*;

    fn submission() -> ClaimSubmission {
        ClaimSubmission {
            provider_name: "Lakeside Medical".to_string(),
            insurer_code: "INS-B".to_string(),
            encounter_date: date(2025, 6, 18),
            submission_date: date(2025, 6, 19),
            specialty: "Emergency Medicine".to_string(),
            priority_level: 1,
            items: vec![ItemSubmission {
                name: "Triage".to_string(),
                unit_price: dec!(640),
                quantity: 1,
            }],
        }
    }

    #[test]
    fn test_submission_keeps_dates_and_specialty() {
        let provider_id = ProviderId::new_v7();
        let insurer_id = InsurerId::new_v7();
        let claim = submission().into_claim(provider_id, insurer_id).unwrap();

        assert_eq!(claim.provider_id, provider_id);
        assert_eq!(claim.insurer_id, insurer_id);
        assert_eq!(claim.encounter_date, date(2025, 6, 18));
        assert_eq!(claim.submission_date, date(2025, 6, 19));
        assert_eq!(claim.specialty, "Emergency Medicine");
    }

    #[test]
    fn test_priority_zero_rejected() {
        let mut s = submission();
        s.priority_level = 0;
        assert!(matches!(s.validate(), Err(ClaimError::InvalidPriority(0))));
    }

    #[test]
    fn test_no_items_rejected() {
        let mut s = submission();
        s.items.clear();
        assert!(matches!(
            s.into_claim(ProviderId::new_v7(), InsurerId::new_v7()),
            Err(ClaimError::NoItems)
        ));
    }

    #[test]
    fn test_blank_item_name_rejected() {
        let mut s = submission();
        s.items[0].name = String::new();
        assert!(matches!(s.validate(), Err(ClaimError::InvalidItem { .. })));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod policy_properties {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    proptest! {
        #[test]
        fn consistent_bounds_always_validate(
            min in 1u32..100,
            extra in 0u32..100,
            efficiency in 0i64..=100,
        ) {
            let mut insurer = submission_insurer();
            insurer.min_batch_size = min;
            insurer.max_batch_size = min + extra;
            insurer.specialty_preferences.insert("pediatrics".to_string(), Decimal::new(efficiency, 2));
            prop_assert!(insurer.validate().is_ok());
        }

        #[test]
        fn maximum_below_minimum_never_validates(min in 2u32..100, shortfall in 1u32..100) {
            let mut insurer = submission_insurer();
            insurer.min_batch_size = min;
            insurer.max_batch_size = min.saturating_sub(shortfall);
            let rejected = matches!(
                insurer.validate(),
                Err(ClaimError::InvalidInsurerPolicy { field, .. }) if field == "max_batch_size"
            );
            prop_assert!(rejected);
        }

        #[test]
        fn batch_date_is_always_the_previous_day(days in 0i64..20_000) {
            let relevant = date(1990, 1, 1) + chrono::Duration::days(days);
            let batch_date = batch_date_from(relevant);
            prop_assert_eq!(relevant - batch_date, chrono::Duration::days(1));
        }
    }
}
