//! Amount Computation
//!
//! Turns the user-authored amount expression into the gateway's integer
//! minor-unit amount. Every handled currency uses a 1/100 minor unit.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{PaymentError, Result};
use crate::variables::{VariableBinding, VariableInterpolator};

const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Resolve `expression` and convert it to minor units.
///
/// Rounds half-up after scaling, so `19.999` becomes `2000` and `0.005`
/// becomes `1`. Non-numeric and negative results are validation errors.
/// Zero is passed through and left for the gateway to judge.
pub fn compute_amount(
    interpolator: &dyn VariableInterpolator,
    bindings: &[VariableBinding],
    expression: &str,
) -> Result<i64> {
    let resolved = interpolator.interpolate(bindings, expression);
    to_minor_units(&resolved)
}

/// Convert a major-unit decimal string to minor units
pub fn to_minor_units(resolved: &str) -> Result<i64> {
    let trimmed = resolved.trim();
    let major = parse_decimal(trimmed)
        .ok_or_else(|| PaymentError::Validation(format!("amount {trimmed:?} is not a number")))?;

    if major.is_sign_negative() && !major.is_zero() {
        return Err(PaymentError::Validation(format!("amount {trimmed} is negative")));
    }

    major
        .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))
        .map(|minor| minor.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|minor| minor.to_i64())
        .ok_or_else(|| PaymentError::Validation(format!("amount {trimmed} is out of range")))
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    // rust_decimal accepts `_` digit separators; amounts must not
    if s.is_empty() || s.contains('_') {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Resolve an optional expression; an empty result means "not provided"
pub fn resolve_optional(
    interpolator: &dyn VariableInterpolator,
    bindings: &[VariableBinding],
    expression: Option<&str>,
) -> Option<String> {
    let resolved = interpolator.interpolate(bindings, expression?);
    let trimmed = resolved.trim();

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
