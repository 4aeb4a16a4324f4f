//! # Amortization Module
//!
//! Mô phỏng lịch trả nợ gốc đều (lãi tính trên dư nợ giảm dần) cho một
//! khoản vay giả định. Không đụng tới dữ liệu đã lưu.

use crate::error::{CoreError, CoreResult};
use crate::money::{ensure_currency_amount, ensure_positive, ensure_rate, round_currency};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kỳ hạn dài nhất (50 năm)
pub const MAX_TERM_MONTHS: u32 = 600;

/// Kiểm tra số tháng vay: 1..=600
pub fn ensure_term(term_months: u32) -> CoreResult<()> {
    if term_months == 0 {
        return Err(CoreError::validation("Term must be at least one month"));
    }
    if term_months > MAX_TERM_MONTHS {
        return Err(CoreError::validation(format!(
            "Term cannot exceed {} months: {}",
            MAX_TERM_MONTHS, term_months
        )));
    }
    Ok(())
}

/// Một dòng trong lịch trả nợ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    /// Tháng thứ (bắt đầu từ 1)
    pub month: u32,
    /// Tổng phải trả trong tháng
    pub installment: Decimal,
    pub interest: Decimal,
    pub principal: Decimal,
    /// Dư nợ sau khi trả
    pub balance: Decimal,
}

/// Lịch trả nợ mô phỏng
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub principal: Decimal,
    pub rate_percent: Decimal,
    pub term_months: u32,
    /// Lãi tháng đầu trên toàn bộ gốc
    pub monthly_interest: Decimal,
    /// Tổng lãi = tổng các dòng lãi đã làm tròn
    pub total_interest: Decimal,
    /// Gốc + tổng lãi
    pub total_to_pay: Decimal,
    pub rows: Vec<ScheduleRow>,
}

impl Schedule {
    pub fn first(&self) -> Option<&ScheduleRow> {
        self.rows.first()
    }

    pub fn last(&self) -> Option<&ScheduleRow> {
        self.rows.last()
    }
}

/// Lập lịch trả nợ: gốc chia đều `principal / term_months` mỗi tháng,
/// lãi tháng = dư nợ đầu tháng * `rate_percent` / 100.
///
/// Mỗi dòng làm tròn 2 chữ số; tổng lãi cộng từ các giá trị đã làm tròn,
/// nên có thể lệch 1 cent so với làm tròn tổng chính xác.
pub fn simulate(principal: Decimal, rate_percent: Decimal, term_months: u32) -> CoreResult<Schedule> {
    ensure_positive("Principal", principal)?;
    ensure_currency_amount("Principal", principal)?;
    ensure_rate(rate_percent)?;
    ensure_term(term_months)?;

    let rate = rate_percent / Decimal::ONE_HUNDRED;
    let principal_due = principal / Decimal::from(term_months);
    let mut balance = principal;
    let mut rows = Vec::with_capacity(term_months as usize);

    for month in 1..=term_months {
        let interest = balance * rate;
        let installment = interest + principal_due;
        balance = (balance - principal_due).max(Decimal::ZERO);

        rows.push(ScheduleRow {
            month,
            installment: round_currency(installment),
            interest: round_currency(interest),
            principal: round_currency(principal_due),
            balance: round_currency(balance),
        });
    }

    let total_interest: Decimal = rows.iter().map(|r| r.interest).sum();

    Ok(Schedule {
        principal,
        rate_percent,
        term_months,
        monthly_interest: round_currency(principal * rate),
        total_interest: round_currency(total_interest),
        total_to_pay: round_currency(principal + total_interest),
        rows,
    })
}
