use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a monetary amount to two decimal places, half away from zero.
///
/// Every amount that leaves a calculation (quotes, fees, refunds) goes
/// through this. The result carries exactly two decimals, so whole amounts
/// serialize as "300.00" rather than "300".
pub fn round_minor(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Clamps a computed amount at zero. Charges are never negative, no matter
/// how adjustments stack up.
pub fn floor_zero(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Converts a two-decimal amount into integer minor units (e.g. 285.00 INR
/// into 28500 paise). Returns `None` if the value does not fit in an i64.
pub fn to_minor_units(value: Decimal) -> Option<i64> {
    (value * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}
