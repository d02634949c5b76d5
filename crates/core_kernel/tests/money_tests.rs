//! Tests for money arithmetic and rounding used by claim totals and cost reporting

use core_kernel::money::{round_half_up, Currency, Money};
use rust_decimal_macros::dec;

#[test]
fn test_item_subtotal_is_unit_price_times_quantity() {
    let unit_price = Money::usd(dec!(150.00));
    let subtotal = unit_price.multiply(dec!(3));
    assert_eq!(subtotal.amount(), dec!(450.00));
}

#[test]
fn test_claim_total_sums_item_subtotals() {
    let subtotals = [
        Money::usd(dec!(150.00)),
        Money::usd(dec!(75.25)),
        Money::usd(dec!(0.75)),
    ];
    let total = Money::sum(Currency::USD, subtotals.iter()).unwrap();
    assert_eq!(total.amount(), dec!(226.00));
}

#[test]
fn test_sum_of_nothing_is_zero() {
    let total = Money::sum(Currency::USD, std::iter::empty()).unwrap();
    assert!(total.is_zero());
}

#[test]
fn test_sum_rejects_mixed_currencies() {
    let mixed = [Money::usd(dec!(1)), Money::new(dec!(1), Currency::EUR)];
    assert!(Money::sum(Currency::USD, mixed.iter()).is_err());
}

#[test]
fn test_round_half_up_differs_from_bankers_rounding() {
    // Decimal::round_dp would give 0.12 here
    assert_eq!(round_half_up(dec!(0.125), 2), dec!(0.13));
    assert_eq!(round_half_up(dec!(1.2155), 3), dec!(1.216));
}

#[test]
fn test_money_serde_roundtrip_keeps_currency() {
    let m = Money::usd(dec!(1250.50));
    let json = serde_json::to_string(&m).unwrap();
    assert!(json.contains("USD"));
    let back: Money = serde_json::from_str(&json).unwrap();
    assert_eq!(back, m);
}
