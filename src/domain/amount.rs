//! Conversion between stored minor units and decimal amounts.
//!
//! `decode` turns the integer amount of a transaction into a decimal with
//! exactly `decimal_places` fractional digits; `encode` goes the other way and
//! rounds half away from zero. Both are pure and never touch floating point.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::error::{LedgerError, LedgerResult};
use crate::services::math::{ensure_places, BigDecimalMath, DecimalMath};

pub fn decode(
    amount: &BigInt,
    decimal_places: i64,
    decimal_places_value: &BigInt,
) -> LedgerResult<BigDecimal> {
    decode_with(&BigDecimalMath, amount, decimal_places, decimal_places_value)
}

pub fn encode(amount: &BigDecimal, decimal_places: i64) -> LedgerResult<BigInt> {
    encode_with(&BigDecimalMath, amount, decimal_places)
}

pub fn decode_with(
    math: &dyn DecimalMath,
    amount: &BigInt,
    decimal_places: i64,
    decimal_places_value: &BigInt,
) -> LedgerResult<BigDecimal> {
    ensure_places(decimal_places)?;
    math.div(amount, decimal_places, decimal_places_value)
}

pub fn encode_with(
    math: &dyn DecimalMath,
    amount: &BigDecimal,
    decimal_places: i64,
) -> LedgerResult<BigInt> {
    ensure_places(decimal_places)?;
    let scaled = math.mul(amount, decimal_places)?;
    math.round(&scaled)
}

/// Decimal reading of a float, using its shortest round-trip rendering so
/// that `10.005_f64` is taken as `10.005` rather than its binary neighbour.
pub fn decimal_from_f64(amount: f64) -> LedgerResult<BigDecimal> {
    if !amount.is_finite() {
        return Err(LedgerError::NonFiniteAmount(amount.to_string()));
    }
    parse_decimal(&amount.to_string())
}

pub fn parse_decimal(raw: &str) -> LedgerResult<BigDecimal> {
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if matches!(
        lowered.trim_start_matches(['+', '-']),
        "nan" | "inf" | "infinity"
    ) {
        return Err(LedgerError::NonFiniteAmount(trimmed.to_string()));
    }

    BigDecimal::from_str(trimmed)
        .map_err(|e| LedgerError::NonFiniteAmount(format!("{:?}: {}", trimmed, e)))
}
