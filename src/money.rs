//! Fixed-point decimal helpers. Every monetary or quantity value in the
//! engine carries exactly 8 fractional digits; this module is the only
//! place that parses, formats, or multiplies them.

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

pub const SCALE: u32 = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("invalid decimal value: {0}")]
    Parse(String),
    #[error("value must be positive")]
    NotPositive,
    #[error("value has more than {SCALE} fractional digits")]
    Precision,
    #[error("arithmetic overflow")]
    Overflow,
}

/// Parses a decimal string, rejecting more than 8 fractional digits instead
/// of silently rounding: callers at the HTTP edge should see excess
/// precision as a validation error, not a surprise truncation.
pub fn parse(input: &str) -> Result<Decimal, MoneyError> {
    let value = Decimal::from_str(input.trim()).map_err(|_| MoneyError::Parse(input.to_string()))?;
    if value.scale() > SCALE {
        return Err(MoneyError::Precision);
    }
    Ok(value.normalize())
}

pub fn parse_positive(input: &str) -> Result<Decimal, MoneyError> {
    let value = parse(input)?;
    if !is_positive(value) {
        return Err(MoneyError::NotPositive);
    }
    Ok(value)
}

/// Always renders exactly 8 fractional digits, the wire format required by
/// every JSON response that carries money or quantity.
pub fn format(value: Decimal) -> String {
    format!("{:.*}", SCALE as usize, value.round_dp(SCALE))
}

/// Multiplication truncates (rounds toward zero) to 8 digits, matching the
/// spec's requirement that `mul` not round away from zero like `round_dp`
/// does for negative halves (values here are never negative in practice,
/// but truncation is the contractually specified behavior).
pub fn checked_mul(a: Decimal, b: Decimal) -> Result<Decimal, MoneyError> {
    let product = a.checked_mul(b).ok_or(MoneyError::Overflow)?;
    Ok(product.trunc_with_scale(SCALE))
}

pub fn is_positive(value: Decimal) -> bool {
    value.is_sign_positive() && !value.is_zero()
}

pub fn has_valid_precision(value: Decimal) -> bool {
    value.scale() <= SCALE
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn format_always_pads_to_eight_digits() {
        assert_eq!(format(dec!(50000)), "50000.00000000");
        assert_eq!(format(dec!(1.5)), "1.50000000");
    }

    #[test]
    fn parse_rejects_excess_precision() {
        assert_eq!(parse("1.123456789"), Err(MoneyError::Precision));
        assert!(parse("1.12345678").is_ok());
    }

    #[test]
    fn parse_round_trips_eight_digit_input() {
        let parsed = parse("50000.00000000").unwrap();
        assert_eq!(format(parsed), "50000.00000000");
    }

    #[test]
    fn checked_mul_truncates_not_rounds() {
        // 1.00000001 * 1.00000001 = 1.0000000200000001 -> truncated to 8 digits
        let a = dec!(1.00000001);
        let b = dec!(1.00000001);
        let product = checked_mul(a, b).unwrap();
        assert_eq!(format(product), "1.00000002");
    }

    #[test]
    fn commission_matches_spec_example() {
        // 50000 * 1 * 0.015 = 750
        let volume = checked_mul(dec!(50000), dec!(1)).unwrap();
        let commission = checked_mul(volume, dec!(0.015)).unwrap();
        assert_eq!(format(commission), "750.00000000");
    }

    #[test]
    fn parse_positive_rejects_zero() {
        assert_eq!(parse_positive("0"), Err(MoneyError::NotPositive));
        assert_eq!(parse_positive("-1"), Err(MoneyError::NotPositive));
    }
}
