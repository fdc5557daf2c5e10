//! Shared arithmetic helpers for claim calculations.
//!
//! Every monetary line a worksheet produces goes through [`round_currency`],
//! so stored figures always carry exactly two fractional digits.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits carried by every monetary value.
pub const CURRENCY_SCALE: u32 = 2;

/// Largest difference at which two currency amounts are considered equal.
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest magnitude accepted for any amount, quantity or contract value
/// (one trillion). Products of two such values stay well inside
/// [`Decimal::MAX`], so worksheet arithmetic cannot overflow.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Rounds to two decimal places, half away from zero, and fixes the scale
/// at two so the value always displays as `1234.50` rather than `1234.5`.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use claim_core::calculations::common::round_currency;
///
/// assert_eq!(round_currency(dec!(123.454)).to_string(), "123.45");
/// assert_eq!(round_currency(dec!(123.455)).to_string(), "123.46");
/// assert_eq!(round_currency(dec!(-123.455)).to_string(), "-123.46");
/// assert_eq!(round_currency(dec!(1125000)).to_string(), "1125000.00");
/// ```
pub fn round_currency(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_SCALE);
    rounded
}

/// Converts a percentage such as `10.00` into the fraction `0.10`.
pub fn percent_to_rate(percent: Decimal) -> Decimal {
    percent / HUNDRED
}

/// `value × percent / 100`, unrounded.
///
/// ```
/// use rust_decimal_macros::dec;
/// use claim_core::calculations::common::percent_of;
///
/// assert_eq!(percent_of(dec!(300000), dec!(50)), dec!(150000));
/// ```
pub fn percent_of(
    value: Decimal,
    percent: Decimal,
) -> Decimal {
    value * percent / HUNDRED
}

/// Whether `value` lies within `-MAX_AMOUNT..=MAX_AMOUNT`.
pub fn within_amount_range(value: Decimal) -> bool {
    value.abs() <= MAX_AMOUNT
}

/// Whether two amounts agree to within [`MONEY_TOLERANCE`].
pub fn within_tolerance(
    a: Decimal,
    b: Decimal,
) -> bool {
    (a - b).abs() <= MONEY_TOLERANCE
}
