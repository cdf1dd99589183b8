//! Property-based tests for entry input validation.

use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::Value;

use super::error::LedgerError;
use super::validation::{MAX_AMOUNT, parse_amount};

/// Strategy to generate a valid positive amount (> 0).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    // 0.01 to 1,000,000.00
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for amounts above the storable range, up to `Decimal::MAX`.
fn oversized_amount() -> impl Strategy<Value = Decimal> {
    (1u64..u64::MAX).prop_map(|excess| {
        MAX_AMOUNT
            .checked_add(Decimal::from(excess))
            .unwrap_or(Decimal::MAX)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any non-negative amount written as a string parses back to itself.
    #[test]
    fn prop_string_amount_parses(amount in positive_amount()) {
        let parsed = parse_amount(Some(&Value::String(amount.to_string()))).unwrap();
        prop_assert_eq!(parsed, amount);
    }

    /// A decimal comma reads the same as a decimal point.
    #[test]
    fn prop_decimal_comma_accepted(amount in positive_amount()) {
        let with_comma = amount.to_string().replace('.', ",");
        let parsed = parse_amount(Some(&Value::String(with_comma))).unwrap();
        prop_assert_eq!(parsed, amount);
    }

    /// Negative amounts are always rejected.
    #[test]
    fn prop_negative_amount_rejected(amount in positive_amount()) {
        let negative = Value::String((-amount).to_string());
        prop_assert!(matches!(parse_amount(Some(&negative)), Err(LedgerError::InvalidAmount(_))));
    }

    /// Integer cents as JSON numbers parse exactly.
    #[test]
    fn prop_integer_amount_parses(units in 0i64..10_000_000i64) {
        let parsed = parse_amount(Some(&Value::from(units))).unwrap();
        prop_assert_eq!(parsed, Decimal::from(units));
    }

    /// Amounts past the storable range are rejected before any arithmetic.
    #[test]
    fn prop_oversized_amount_rejected(amount in oversized_amount()) {
        let raw = Value::String(amount.to_string());
        prop_assert!(matches!(parse_amount(Some(&raw)), Err(LedgerError::InvalidAmount(_))));
    }
}
