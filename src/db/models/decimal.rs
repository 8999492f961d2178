use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Two-decimal values (percentages, prices, VAT) are stored as an integer
/// count of hundredths.
pub const HUNDREDTHS_SCALE: u32 = 2;

/// Round to two decimal places (half away from zero) and return the value in
/// hundredths. `None` if it does not fit in an `i64`.
pub fn to_hundredths(value: Decimal) -> Option<i64> {
    let rounded =
        value.round_dp_with_strategy(HUNDREDTHS_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.checked_mul(Decimal::ONE_HUNDRED)?.to_i64()
}

/// Inverse of [`to_hundredths`]. Always carries two decimal places, so
/// `6000` renders as `"60.00"`.
pub fn from_hundredths(value: i64) -> Decimal {
    Decimal::new(value, HUNDREDTHS_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(to_hundredths(Decimal::from_str("33.335").unwrap()), Some(3334));
        assert_eq!(to_hundredths(Decimal::from_str("33.334").unwrap()), Some(3333));
        assert_eq!(to_hundredths(Decimal::from_str("-0.005").unwrap()), Some(-1));
    }

    #[test]
    fn renders_with_two_decimals() {
        assert_eq!(from_hundredths(6000).to_string(), "60.00");
        assert_eq!(from_hundredths(0).to_string(), "0.00");
        assert_eq!(from_hundredths(1250).to_string(), "12.50");
    }

    #[test]
    fn out_of_range_values_are_none() {
        assert_eq!(to_hundredths(Decimal::MAX), None);
        assert_eq!(to_hundredths(Decimal::MIN), None);
        assert_eq!(to_hundredths(Decimal::from_scientific("1e28").unwrap()), None);
        assert_eq!(
            to_hundredths(Decimal::from_str("92233720368547758.08").unwrap()),
            None
        );
    }
}
