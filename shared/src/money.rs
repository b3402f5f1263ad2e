//! Money calculation utilities using rust_decimal for precision
//!
//! All calculations are done using `Decimal` internally, then converted to `f64`
//! for storage/serialization.

use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// price × quantity
pub fn line_total(price: f64, quantity: i32) -> f64 {
    to_f64(to_decimal(price) * Decimal::from(quantity))
}

/// Σ price × quantity over the given lines
pub fn sum_lines(lines: impl IntoIterator<Item = (f64, i32)>) -> f64 {
    let total: Decimal = lines
        .into_iter()
        .map(|(price, qty)| to_decimal(price) * Decimal::from(qty))
        .sum();
    to_f64(total)
}

/// Validate that a monetary input is finite and non-negative
pub fn is_valid_amount(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_drift_is_rounded_away() {
        // 0.1 + 0.2 in f64 is 0.30000000000000004
        assert_eq!(sum_lines([(0.1, 1), (0.2, 1)]), 0.3);
        assert_eq!(line_total(19.99, 3), 59.97);
    }

    #[test]
    fn test_sum_lines_empty() {
        assert_eq!(sum_lines(std::iter::empty()), 0.0);
    }

    #[test]
    fn test_is_valid_amount() {
        assert!(is_valid_amount(0.0));
        assert!(is_valid_amount(12.5));
        assert!(!is_valid_amount(-1.0));
        assert!(!is_valid_amount(f64::NAN));
        assert!(!is_valid_amount(f64::INFINITY));
    }
}
