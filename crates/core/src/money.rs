//! # Money Module
//!
//! Các phép tính tiền tệ với rust_decimal: làm tròn 2 chữ số thập phân
//! (round-half-up) và lãi đơn theo kỳ.

use crate::error::{CoreError, CoreResult};
use rust_decimal::{Decimal, RoundingStrategy};

/// Số chữ số thập phân của tiền tệ
pub const CURRENCY_DP: u32 = 2;

/// Số tiền lớn nhất: 12 chữ số, 2 chữ số thập phân (9,999,999,999.99)
pub const MAX_CURRENCY_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, CURRENCY_DP);

/// Làm tròn về 2 chữ số thập phân, .5 làm tròn ra xa 0.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Lãi của một kỳ: `balance * rate_percent / 100`, làm tròn 2 chữ số.
///
/// # Examples
/// ```
/// use lendbook_core::monthly_interest;
/// use rust_decimal::Decimal;
///
/// let interest = monthly_interest(Decimal::new(1_000_000, 0), Decimal::new(5, 0));
/// assert_eq!(interest, Decimal::new(5_000_000, 2));
/// ```
pub fn monthly_interest(balance: Decimal, rate_percent: Decimal) -> Decimal {
    round_currency(balance * rate_percent / Decimal::ONE_HUNDRED)
}

/// Kiểm tra số tiền dương
pub fn ensure_positive(field: &str, amount: Decimal) -> CoreResult<()> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::InvalidAmount(format!(
            "{} must be positive: {}",
            field, amount
        )));
    }
    Ok(())
}

/// Kiểm tra số tiền nằm trong giới hạn tiền tệ: tối đa 12 chữ số,
/// tối đa 2 chữ số thập phân.
pub fn ensure_currency_amount(field: &str, amount: Decimal) -> CoreResult<()> {
    if amount.normalize().scale() > CURRENCY_DP {
        return Err(CoreError::InvalidAmount(format!(
            "{} has more than {} decimal places: {}",
            field, CURRENCY_DP, amount
        )));
    }
    if amount.abs() > MAX_CURRENCY_AMOUNT {
        return Err(CoreError::InvalidAmount(format!(
            "{} exceeds the maximum of {}: {}",
            field, MAX_CURRENCY_AMOUNT, amount
        )));
    }
    Ok(())
}

/// Kiểm tra số tiền không âm
pub fn ensure_non_negative(field: &str, amount: Decimal) -> CoreResult<()> {
    if amount < Decimal::ZERO {
        return Err(CoreError::InvalidAmount(format!(
            "{} cannot be negative: {}",
            field, amount
        )));
    }
    Ok(())
}

/// Kiểm tra lãi suất hợp lệ (0..=100%)
pub fn ensure_rate(rate_percent: Decimal) -> CoreResult<()> {
    if rate_percent < Decimal::ZERO || rate_percent > Decimal::ONE_HUNDRED {
        return Err(CoreError::validation(format!(
            "Interest rate must be between 0 and 100: {}",
            rate_percent
        )));
    }
    Ok(())
}
