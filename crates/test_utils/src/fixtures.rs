//! Pre-built Test Fixtures
//!
//! The four reference insurers the system is seeded with, plus fixed dates.
//! These fixtures are designed to be consistent and predictable for unit tests.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use uuid::Uuid;

use core_kernel::InsurerId;
use domain_claims::{DatePreference, Insurer};

/// Specialties the reference insurers declare efficiencies for
pub const SPECIALTIES: [&str; 7] = [
    "cardiology",
    "orthopedics",
    "neurology",
    "oncology",
    "general medicine",
    "pediatrics",
    "emergency medicine",
];

fn preferences(efficiencies: [Decimal; 7]) -> BTreeMap<String, Decimal> {
    SPECIALTIES
        .iter()
        .zip(efficiencies)
        .map(|(specialty, efficiency)| (specialty.to_string(), efficiency))
        .collect()
}

/// Ids match the insurers seeded by the schema migration
fn seeded_id(n: u128) -> InsurerId {
    InsurerId::from_uuid(Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0000 | n))
}

fn reference_insurer(
    id: InsurerId,
    letter: char,
    date_preference: DatePreference,
    min_batch_size: u32,
    max_batch_size: u32,
    daily_capacity: u32,
    efficiencies: [Decimal; 7],
) -> Insurer {
    Insurer {
        id,
        name: format!("Insurer {}", letter),
        code: format!("INS-{}", letter),
        email: Some(format!("insurer.{}@example.com", letter.to_ascii_lowercase())),
        date_preference,
        specialty_preferences: preferences(efficiencies),
        min_batch_size,
        max_batch_size,
        daily_capacity,
    }
}

static SEEDED: Lazy<Vec<Insurer>> = Lazy::new(|| {
    vec![
        reference_insurer(
            seeded_id(0xa),
            'A',
            DatePreference::Encounter,
            3,
            15,
            50,
            [dec!(0.8), dec!(0.9), dec!(0.7), dec!(0.6), dec!(0.95), dec!(0.85), dec!(0.75)],
        ),
        reference_insurer(
            seeded_id(0xb),
            'B',
            DatePreference::Submission,
            5,
            25,
            100,
            [dec!(0.9), dec!(0.7), dec!(0.8), dec!(0.5), dec!(0.9), dec!(0.8), dec!(0.6)],
        ),
        reference_insurer(
            seeded_id(0xc),
            'C',
            DatePreference::Encounter,
            2,
            20,
            75,
            [dec!(0.6), dec!(0.8), dec!(0.9), dec!(0.8), dec!(0.85), dec!(0.7), dec!(0.9)],
        ),
        reference_insurer(
            seeded_id(0xd),
            'D',
            DatePreference::Submission,
            4,
            30,
            150,
            [dec!(0.7), dec!(0.6), dec!(0.8), dec!(0.9), dec!(0.8), dec!(0.9), dec!(0.7)],
        ),
    ]
});

/// Fixture for insurer test data
pub struct InsurerFixtures;

impl InsurerFixtures {
    /// All four reference insurers, with stable ids
    pub fn seeded() -> Vec<Insurer> {
        SEEDED.clone()
    }

    /// Encounter-date insurer: min 3, max 15, capacity 50
    pub fn insurer_a() -> Insurer {
        SEEDED[0].clone()
    }

    /// Submission-date insurer: min 5, max 25, capacity 100
    pub fn insurer_b() -> Insurer {
        SEEDED[1].clone()
    }

    /// Encounter-date insurer: min 2, max 20, capacity 75
    pub fn insurer_c() -> Insurer {
        SEEDED[2].clone()
    }

    /// Submission-date insurer: min 4, max 30, capacity 150
    pub fn insurer_d() -> Insurer {
        SEEDED[3].clone()
    }

    /// Insurer A under a fresh id, for tests that must not share state
    pub fn fresh_insurer_a() -> Insurer {
        Insurer {
            id: InsurerId::new_v7(),
            ..Self::insurer_a()
        }
    }
}

/// Fixture for dates
pub struct DateFixtures;

impl DateFixtures {
    /// A mid-month working date (June 16, 2025)
    pub fn mid_month() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
    }

    /// First of the month (June 1, 2025)
    pub fn month_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    /// Day before `mid_month`, where its batches land
    pub fn mid_month_batch_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }
}
