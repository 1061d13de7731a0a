//! Exact decimal arithmetic used by the amount codec.

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use crate::error::{LedgerError, LedgerResult};

/// Decimal operations the amount codec is built on.
///
/// Implementations must be exact: no binary floating point anywhere.
pub trait DecimalMath: Send + Sync {
    /// `amount / scale`, carried to `places` fractional digits.
    fn div(&self, amount: &BigInt, places: i64, scale: &BigInt) -> LedgerResult<BigDecimal>;

    /// `amount * 10^places`.
    fn mul(&self, amount: &BigDecimal, places: i64) -> LedgerResult<BigDecimal>;

    /// Nearest integer, half away from zero.
    fn round(&self, value: &BigDecimal) -> LedgerResult<BigInt>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BigDecimalMath;

pub fn ensure_places(places: i64) -> LedgerResult<()> {
    if places < 0 {
        return Err(LedgerError::InvalidPrecision(format!(
            "decimal places must be non-negative, got {}",
            places
        )));
    }
    Ok(())
}

pub fn pow10(places: u32) -> BigInt {
    num_traits::pow(BigInt::from(10u8), places as usize)
}

/// Upper bound on the number of decimal digits in `value`.
fn max_digits(value: &BigInt) -> u64 {
    // log10(2) < 30103 / 100000
    value.bits() * 30_103 / 100_000 + 1
}

fn exponent_as_u32(exponent: u64) -> LedgerResult<u32> {
    u32::try_from(exponent).map_err(|_| {
        LedgerError::NonFiniteAmount(format!("exponent out of range: {}", exponent))
    })
}

fn places_as_u32(places: i64) -> LedgerResult<u32> {
    ensure_places(places)?;
    u32::try_from(places).map_err(|_| {
        LedgerError::InvalidPrecision(format!("decimal places out of range: {}", places))
    })
}

impl DecimalMath for BigDecimalMath {
    fn div(&self, amount: &BigInt, places: i64, scale: &BigInt) -> LedgerResult<BigDecimal> {
        let digits = places_as_u32(places)?;
        if !scale.is_positive() {
            return Err(LedgerError::InvalidPrecision(format!(
                "decimal places value must be positive, got {}",
                scale
            )));
        }

        // Integer division on the value shifted left by `places` digits keeps
        // the quotient exact to that many fractional digits.
        let shifted = amount * pow10(digits);
        Ok(BigDecimal::new(shifted / scale, places))
    }

    fn mul(&self, amount: &BigDecimal, places: i64) -> LedgerResult<BigDecimal> {
        let digits = places_as_u32(places)?;
        let (mantissa, exponent) = amount.as_bigint_and_exponent();
        let shifted = exponent.checked_sub(i64::from(digits)).ok_or_else(|| {
            LedgerError::NonFiniteAmount(format!("exponent out of range: {}", exponent))
        })?;
        Ok(BigDecimal::new(mantissa, shifted))
    }

    fn round(&self, value: &BigDecimal) -> LedgerResult<BigInt> {
        let (mantissa, exponent) = value.as_bigint_and_exponent();
        if mantissa.is_zero() {
            return Ok(BigInt::zero());
        }
        if exponent <= 0 {
            let digits = exponent_as_u32(exponent.unsigned_abs())?;
            return Ok(mantissa * pow10(digits));
        }

        // More fractional digits than the mantissa has: |value| < 0.1.
        if exponent.unsigned_abs() > max_digits(&mantissa) {
            return Ok(BigInt::zero());
        }

        let divisor = pow10(exponent_as_u32(exponent.unsigned_abs())?);
        let quotient = &mantissa / &divisor;
        let remainder = &mantissa % &divisor;

        if !remainder.is_zero() && remainder.abs() * 2 >= divisor {
            if mantissa.is_negative() {
                Ok(quotient - 1)
            } else {
                Ok(quotient + 1)
            }
        } else {
            Ok(quotient)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn div_is_exact() {
        let math = BigDecimalMath;
        let result = math.div(&BigInt::from(12345), 2, &BigInt::from(100)).unwrap();
        assert_eq!(result, dec("123.45"));
        assert_eq!(result.to_string(), "123.45");
    }

    #[test]
    fn div_keeps_trailing_zero_digits() {
        let math = BigDecimalMath;
        let result = math.div(&BigInt::from(100), 2, &BigInt::from(100)).unwrap();
        assert_eq!(result.to_string(), "1.00");
    }

    #[test]
    fn div_rejects_non_positive_scale() {
        let math = BigDecimalMath;
        let err = math.div(&BigInt::from(1), 2, &BigInt::from(0)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPrecision(_)));
    }

    #[test]
    fn mul_shifts_exactly() {
        let math = BigDecimalMath;
        assert_eq!(math.mul(&dec("10.005"), 2).unwrap(), dec("1000.5"));
        assert_eq!(math.mul(&dec("7"), 3).unwrap(), dec("7000"));
        assert_eq!(math.mul(&dec("0.1"), 0).unwrap(), dec("0.1"));
    }

    #[test]
    fn round_half_away_from_zero() {
        let math = BigDecimalMath;
        assert_eq!(math.round(&dec("1000.5")).unwrap(), BigInt::from(1001));
        assert_eq!(math.round(&dec("-1000.5")).unwrap(), BigInt::from(-1001));
        assert_eq!(math.round(&dec("1000.49")).unwrap(), BigInt::from(1000));
        assert_eq!(math.round(&dec("-1000.49")).unwrap(), BigInt::from(-1000));
        assert_eq!(math.round(&dec("2.5")).unwrap(), BigInt::from(3));
        assert_eq!(math.round(&dec("0.4")).unwrap(), BigInt::from(0));
    }

    #[test]
    fn round_handles_negative_exponents() {
        let math = BigDecimalMath;
        assert_eq!(math.round(&dec("12e3")).unwrap(), BigInt::from(12000));
    }

    #[test]
    fn round_with_extreme_exponents() {
        let math = BigDecimalMath;
        assert_eq!(math.round(&dec("5e-4294967297")).unwrap(), BigInt::from(0));
        assert_eq!(math.round(&dec("-5e-4294967297")).unwrap(), BigInt::from(0));
        assert_eq!(math.round(&dec("5e-1")).unwrap(), BigInt::from(1));
        assert_eq!(math.round(&dec("5e-2")).unwrap(), BigInt::from(0));
        assert_eq!(math.round(&dec("0e4294967297")).unwrap(), BigInt::from(0));
        assert!(matches!(
            math.round(&dec("1e4294967297")),
            Err(LedgerError::NonFiniteAmount(_))
        ));
    }

    #[test]
    fn negative_places_rejected() {
        let math = BigDecimalMath;
        assert!(matches!(
            math.mul(&dec("1"), -1),
            Err(LedgerError::InvalidPrecision(_))
        ));
        assert!(matches!(
            math.div(&BigInt::from(1), -3, &BigInt::from(1)),
            Err(LedgerError::InvalidPrecision(_))
        ));
    }
}
