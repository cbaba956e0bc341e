//! Fixed-point numeric layer.
//!
//! Every amount, price, cost and fee in SpotMatch is an `i128` integer scaled
//! by `10^precision`, where the precision comes from the market
//! configuration. Binary floating point is never used.
//!
//! Rounding policy:
//! - [`Rounding::Down`] (toward zero) for filled quantities and principal costs
//! - [`Rounding::HalfUp`] (half away from zero) for fee amounts
//!
//! Decimal strings are parsed with `rust_decimal` and then rescaled, so
//! inputs like `"1e-3"` are rejected while `"0.500"` is accepted.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{FEE_RATE_PRECISION, MAX_PRECISION};
use crate::{Result, SpotmatchError};

/// Rounding mode for operations that drop fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rounding {
    /// Truncate toward zero.
    Down,
    /// Round half away from zero.
    HalfUp,
}

/// `10^exp` as `i128`.
///
/// # Errors
/// Returns `Overflow` if `exp` is larger than `i128` can hold.
pub fn pow10(exp: u32) -> Result<i128> {
    10_i128.checked_pow(exp).ok_or(SpotmatchError::Overflow)
}

/// Parse a decimal string into an integer scaled by `10^precision`.
///
/// Trailing fractional zeros do not count toward the precision check:
/// `"1.50"` is valid at precision 1.
///
/// # Errors
/// - `InvalidNumber` for malformed or negative input
/// - `PrecisionExceeded` when the value has more significant fractional
///   digits than `precision`
pub fn to_integer(input: &str, precision: u32) -> Result<i128> {
    let trimmed = input.trim();
    if precision > MAX_PRECISION {
        return Err(SpotmatchError::Configuration(format!(
            "precision {precision} exceeds maximum {MAX_PRECISION}"
        )));
    }
    let value = Decimal::from_str(trimmed)
        .map_err(|_| SpotmatchError::InvalidNumber(trimmed.to_string()))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(SpotmatchError::InvalidNumber(trimmed.to_string()));
    }
    from_decimal(value, precision)
}

/// Scale an already-parsed [`Decimal`] (config limits, fee rates) to
/// `precision` fractional digits.
///
/// # Errors
/// Returns `PrecisionExceeded` when `value` has more significant fractional
/// digits than `precision`.
pub fn from_decimal(value: Decimal, precision: u32) -> Result<i128> {
    let normalized = value.normalize();
    let scale = normalized.scale();
    if scale > precision {
        return Err(SpotmatchError::PrecisionExceeded {
            value: value.to_string(),
            precision,
        });
    }

    normalized
        .mantissa()
        .checked_mul(pow10(precision - scale)?)
        .ok_or(SpotmatchError::Overflow)
}

/// Render a scaled integer as a decimal string with exactly `precision`
/// fractional digits.
#[must_use]
pub fn to_decimal(value: i128, precision: u32) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    if precision == 0 {
        return format!("{sign}{abs}");
    }
    let factor = 10_u128.pow(precision);
    let int_part = abs / factor;
    let frac_part = abs % factor;
    format!(
        "{sign}{int_part}.{frac_part:0width$}",
        width = precision as usize
    )
}

/// Checked addition of two values at the same precision.
pub fn add(a: i128, b: i128) -> Result<i128> {
    a.checked_add(b).ok_or(SpotmatchError::Overflow)
}

/// Checked subtraction of two values at the same precision.
pub fn sub(a: i128, b: i128) -> Result<i128> {
    a.checked_sub(b).ok_or(SpotmatchError::Overflow)
}

/// Integer division with an explicit rounding mode.
fn divide_rounded(numerator: i128, denominator: i128, rounding: Rounding) -> Result<i128> {
    if denominator == 0 {
        return Err(SpotmatchError::DivisionByZero);
    }
    let negative = (numerator < 0) != (denominator < 0);
    let n = numerator.unsigned_abs();
    let d = denominator.unsigned_abs();
    let mut quotient = n / d;
    let remainder = n % d;
    if rounding == Rounding::HalfUp && remainder != 0 && remainder >= d - remainder {
        quotient += 1;
    }
    let quotient = i128::try_from(quotient).map_err(|_| SpotmatchError::Overflow)?;
    Ok(if negative { -quotient } else { quotient })
}

/// Change the scale of `value` from `from` to `to` fractional digits.
pub fn rescale(value: i128, from: u32, to: u32, rounding: Rounding) -> Result<i128> {
    if to >= from {
        value
            .checked_mul(pow10(to - from)?)
            .ok_or(SpotmatchError::Overflow)
    } else {
        divide_rounded(value, pow10(from - to)?, rounding)
    }
}

/// Multiply `a` (scale `a_prec`) by `b` (scale `b_prec`), producing a value
/// at scale `out_prec`.
pub fn mul(
    a: i128,
    a_prec: u32,
    b: i128,
    b_prec: u32,
    out_prec: u32,
    rounding: Rounding,
) -> Result<i128> {
    let product = a.checked_mul(b).ok_or(SpotmatchError::Overflow)?;
    rescale(product, a_prec + b_prec, out_prec, rounding)
}

/// Divide `a` (scale `a_prec`) by `b` (scale `b_prec`), producing a value at
/// scale `out_prec`.
pub fn div(
    a: i128,
    a_prec: u32,
    b: i128,
    b_prec: u32,
    out_prec: u32,
    rounding: Rounding,
) -> Result<i128> {
    if b == 0 {
        return Err(SpotmatchError::DivisionByZero);
    }
    let shift = i64::from(out_prec) + i64::from(b_prec) - i64::from(a_prec);
    let exp = u32::try_from(shift.unsigned_abs()).map_err(|_| SpotmatchError::Overflow)?;
    if shift >= 0 {
        let numerator = a.checked_mul(pow10(exp)?).ok_or(SpotmatchError::Overflow)?;
        divide_rounded(numerator, b, rounding)
    } else {
        let denominator = b.checked_mul(pow10(exp)?).ok_or(SpotmatchError::Overflow)?;
        divide_rounded(a, denominator, rounding)
    }
}

// ---------------------------------------------------------------------------
// FeeRate
// ---------------------------------------------------------------------------

/// A fee rate as a fraction scaled by `10^FEE_RATE_PRECISION`
/// (`"0.001"` is 0.1%). Serialized as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FeeRate(i128);

impl FeeRate {
    pub const ZERO: Self = Self(0);

    /// Parse a fee rate from a decimal string.
    pub fn parse(input: &str) -> Result<Self> {
        let raw = to_integer(input, FEE_RATE_PRECISION)?;
        if raw > pow10(FEE_RATE_PRECISION)? {
            return Err(SpotmatchError::Configuration(format!(
                "fee rate {input} exceeds 100%"
            )));
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn from_raw(raw: i128) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> i128 {
        self.0
    }

    /// Fee owed on `cost` (scale `precision`), rounded half-up.
    ///
    /// Never negative for a non-negative cost.
    pub fn fee_on(self, cost: i128, precision: u32) -> Result<i128> {
        mul(
            cost,
            precision,
            self.0,
            FEE_RATE_PRECISION,
            precision,
            Rounding::HalfUp,
        )
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_decimal(self.0, FEE_RATE_PRECISION))
    }
}

impl Serialize for FeeRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FeeRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
