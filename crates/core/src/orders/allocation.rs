//! Installment allocation using the Largest Remainder Method.
//!
//! A payment is split into equal installments at cent precision. Cents that
//! do not divide evenly go to the first installments, so the installments
//! always sum to the payment exactly.

use rust_decimal::Decimal;
use rust_decimal::prelude::*;

/// Cent precision used for installment values.
pub const CENTS: u32 = 2;

/// Splits `total` into `count` installments whose sum is exactly `total`
/// rounded to cents.
///
/// `100 / 3` becomes `[33.34, 33.33, 33.33]`.
#[must_use]
pub fn split_installments(total: Decimal, count: usize) -> Vec<Decimal> {
    if count == 0 {
        return vec![];
    }
    let total = total.round_dp_with_strategy(CENTS, RoundingStrategy::MidpointNearestEven);
    if count == 1 {
        return vec![total];
    }

    let count_dec = Decimal::from(count as u64);
    let unit = Decimal::new(1, CENTS);
    let base = (total / count_dec).round_dp_with_strategy(CENTS, RoundingStrategy::ToZero);
    let remainder = total - base * count_dec;

    let extra = (remainder / unit)
        .round_dp_with_strategy(0, RoundingStrategy::ToZero)
        .to_usize()
        .unwrap_or(0);

    (0..count)
        .map(|i| if i < extra { base + unit } else { base })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_even_split() {
        assert_eq!(
            split_installments(dec!(900), 3),
            vec![dec!(300), dec!(300), dec!(300)]
        );
    }

    #[test]
    fn test_remainder_goes_to_first_installments() {
        assert_eq!(
            split_installments(dec!(100), 3),
            vec![dec!(33.34), dec!(33.33), dec!(33.33)]
        );
    }

    #[test]
    fn test_single_and_empty() {
        assert_eq!(split_installments(dec!(10.005), 1), vec![dec!(10.00)]);
        assert!(split_installments(dec!(10), 0).is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_installments_sum_to_total(cents in 1i64..100_000_000i64, count in 1usize..48) {
            let total = Decimal::new(cents, 2);
            let parts = split_installments(total, count);

            prop_assert_eq!(parts.len(), count);
            prop_assert_eq!(parts.iter().copied().sum::<Decimal>(), total);

            let max = parts.iter().copied().max().unwrap_or_default();
            let min = parts.iter().copied().min().unwrap_or_default();
            prop_assert!(max - min <= Decimal::new(1, 2));
        }
    }
}
