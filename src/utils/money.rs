use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Largest single amount accepted as input. Seven such amounts plus overtime
/// still fit the `DECIMAL(15,2)` payslip columns.
pub const MAX_AMOUNT: Decimal = dec!(1000000000);

/// Amounts are stored with two decimal places.
pub const MAX_SCALE: u32 = 2;

/// Rounds to the nearest whole currency unit, halves away from zero.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Two decimal places, halves away from zero. Used for rates shown on payslips.
pub fn round_two_places(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Sum that stops at the first overflow instead of panicking.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values.into_iter().try_fold(Decimal::ZERO, Decimal::checked_add)
}

/// Rejects negative amounts, amounts above [`MAX_AMOUNT`] and amounts with
/// more than [`MAX_SCALE`] decimal places.
pub fn check_amount(name: &str, amount: Decimal) -> Result<(), String> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(format!("{name} must not be negative"));
    }
    if amount > MAX_AMOUNT {
        return Err(format!("{name} must not exceed {MAX_AMOUNT}"));
    }
    if amount.normalize().scale() > MAX_SCALE {
        return Err(format!("{name} must have at most {MAX_SCALE} decimal places"));
    }
    Ok(())
}
