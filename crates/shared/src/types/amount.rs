//! Signed amount helpers.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `rust_decimal::Decimal` and carry their direction in the sign:
//! a header's `total`, `paid` and `due` all live on the same signed axis.

use rust_decimal::Decimal;

/// Returns true if `value` lies between zero and `bound` (both inclusive),
/// following the sign of `bound`.
///
/// For a non-negative bound the range is `0..=bound`; for a negative bound it
/// is `bound..=0`.
///
/// # Example
///
/// ```
/// use rust_decimal_macros::dec;
/// use tallybook_shared::types::within_signed_range;
///
/// assert!(within_signed_range(dec!(50), dec!(120)));
/// assert!(within_signed_range(dec!(-50), dec!(-120)));
/// assert!(!within_signed_range(dec!(50), dec!(-120)));
/// ```
#[must_use]
pub fn within_signed_range(value: Decimal, bound: Decimal) -> bool {
    if bound >= Decimal::ZERO {
        value >= Decimal::ZERO && value <= bound
    } else {
        value >= bound && value <= Decimal::ZERO
    }
}

/// Normalizes negative zero to zero so it never renders as `-0.00`.
#[must_use]
pub fn non_negative_zero(value: Decimal) -> Decimal {
    if value.is_zero() { Decimal::ZERO } else { value }
}

/// Returns `+1` or `-1` as a decimal multiplier.
#[must_use]
pub fn sign_factor(positive: bool) -> Decimal {
    if positive { Decimal::ONE } else { Decimal::NEGATIVE_ONE }
}
