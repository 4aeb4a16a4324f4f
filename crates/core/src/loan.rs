//! # Loan Module
//!
//! Định nghĩa Loan - khoản vay của một client với một lender.
//! Dư nợ (balance) chỉ thay đổi qua thanh toán và hủy thanh toán.
//!
//! Trạng thái có hai lớp:
//! - `LoanStatus`: lưu trong DB, chỉ đổi khi có sự kiện (tạo, trả hết, hủy)
//! - `LoanStanding`: tính lúc đọc từ ngày đáo hạn (quá hạn, nợ xấu)

use crate::amortization::ensure_term;
use crate::error::{CoreError, CoreResult};
use crate::money::{ensure_currency_amount, ensure_positive, ensure_rate, monthly_interest};
use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trạng thái lưu trữ của khoản vay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// Đang còn dư nợ
    Active,
    /// Đã trả hết
    Paid,
    /// Đã hủy
    Cancelled,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Paid => "paid",
            LoanStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(LoanStatus::Active),
            "paid" => Some(LoanStatus::Paid),
            "cancelled" => Some(LoanStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tình trạng hiển thị của khoản vay, tính tại thời điểm đọc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStanding {
    Active,
    Paid,
    /// Quá ngày đáo hạn
    Overdue,
    /// Quá hạn lâu hơn ngưỡng nợ xấu
    Delinquent,
    Cancelled,
}

impl LoanStanding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStanding::Active => "active",
            LoanStanding::Paid => "paid",
            LoanStanding::Overdue => "overdue",
            LoanStanding::Delinquent => "delinquent",
            LoanStanding::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(LoanStanding::Active),
            "paid" => Some(LoanStanding::Paid),
            "overdue" => Some(LoanStanding::Overdue),
            "delinquent" => Some(LoanStanding::Delinquent),
            "cancelled" => Some(LoanStanding::Cancelled),
            _ => None,
        }
    }

    /// Tất cả giá trị, theo thứ tự hiển thị trong báo cáo
    pub fn all() -> [LoanStanding; 5] {
        [
            LoanStanding::Active,
            LoanStanding::Paid,
            LoanStanding::Overdue,
            LoanStanding::Delinquent,
            LoanStanding::Cancelled,
        ]
    }

    /// Còn dư nợ phải thu
    pub fn is_outstanding(&self) -> bool {
        matches!(
            self,
            LoanStanding::Active | LoanStanding::Overdue | LoanStanding::Delinquent
        )
    }
}

impl fmt::Display for LoanStanding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cách thu lãi
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestTiming {
    /// Thu lãi trước (đầu kỳ)
    Anticipated,
    /// Thu lãi sau (cuối kỳ)
    Due,
}

impl InterestTiming {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterestTiming::Anticipated => "anticipated",
            InterestTiming::Due => "due",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "anticipated" => Some(InterestTiming::Anticipated),
            "due" => Some(InterestTiming::Due),
            _ => None,
        }
    }
}

impl Default for InterestTiming {
    fn default() -> Self {
        InterestTiming::Due
    }
}

impl fmt::Display for InterestTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dữ liệu tạo khoản vay. Mã khoản vay do hệ thống cấp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLoan {
    pub client_id: i64,
    pub lender_code: String,
    pub codebtor_id: Option<i64>,
    pub initial_amount: Decimal,
    /// None: dùng lãi suất mặc định của lender
    pub rate_percent: Option<Decimal>,
    #[serde(default)]
    pub interest_timing: InterestTiming,
    pub start_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub term_months: Option<u32>,
    /// Ảnh giấy nợ (mặt trước/mặt sau), chỉ lưu tham chiếu
    pub note_photo: Option<String>,
    pub note_photo_back: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl NewLoan {
    /// Kiểm tra dữ liệu, `minimum` là số tiền vay tối thiểu
    pub fn validate(&self, minimum: Decimal) -> CoreResult<()> {
        ensure_positive("Loan amount", self.initial_amount)?;
        ensure_currency_amount("Loan amount", self.initial_amount)?;
        if self.initial_amount < minimum {
            return Err(CoreError::BelowMinimum {
                amount: self.initial_amount,
                minimum,
            });
        }
        if let Some(rate) = self.rate_percent {
            ensure_rate(rate)?;
        }
        if let Some(term) = self.term_months {
            ensure_term(term)?;
        }
        if let Some(due) = self.due_date {
            if due < self.start_date {
                return Err(CoreError::validation(format!(
                    "Due date {} is before start date {}",
                    due, self.start_date
                )));
            }
        }
        if self.lender_code.trim().is_empty() {
            return Err(CoreError::validation("Lender is required"));
        }
        Ok(())
    }

    /// Ngày đáo hạn: ngày nhập, hoặc ngày bắt đầu + số tháng
    pub fn effective_due_date(&self) -> Option<NaiveDate> {
        self.due_date.or_else(|| {
            self.term_months
                .and_then(|m| self.start_date.checked_add_months(Months::new(m)))
        })
    }
}

/// Các trường sửa được của khoản vay. Không có trường tiền: dư nợ chỉ
/// thay đổi qua thanh toán.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDetails {
    pub codebtor_id: Option<i64>,
    #[serde(default)]
    pub interest_timing: InterestTiming,
    /// None: tính lại từ ngày bắt đầu + số tháng
    pub due_date: Option<NaiveDate>,
    pub term_months: Option<u32>,
    pub note_photo: Option<String>,
    pub note_photo_back: Option<String>,
    #[serde(default)]
    pub notes: String,
}

/// Khoản vay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: i64,
    /// Mã khoản vay (PR000001, ...)
    pub code: String,
    pub client_id: i64,
    pub lender_code: String,
    pub codebtor_id: Option<i64>,
    pub initial_amount: Decimal,
    /// Dư nợ gốc hiện tại (saldo actual)
    pub balance: Decimal,
    pub rate_percent: Decimal,
    pub interest_timing: InterestTiming,
    pub start_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub term_months: Option<u32>,
    pub note_photo: Option<String>,
    pub note_photo_back: Option<String>,
    pub notes: String,
    pub status: LoanStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// Tạo khoản vay mới từ dữ liệu đã validate: dư nợ = số tiền vay
    pub fn open(id: i64, code: String, new: &NewLoan, rate_percent: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id,
            code,
            client_id: new.client_id,
            lender_code: new.lender_code.clone(),
            codebtor_id: new.codebtor_id,
            initial_amount: new.initial_amount,
            balance: new.initial_amount,
            rate_percent,
            interest_timing: new.interest_timing,
            start_date: new.start_date,
            due_date: new.effective_due_date(),
            term_months: new.term_months,
            note_photo: new.note_photo.clone(),
            note_photo_back: new.note_photo_back.clone(),
            notes: new.notes.clone(),
            status: LoanStatus::Active,
            paid_at: None,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Thông tin sửa được hiện tại
    pub fn details(&self) -> LoanDetails {
        LoanDetails {
            codebtor_id: self.codebtor_id,
            interest_timing: self.interest_timing,
            due_date: self.due_date,
            term_months: self.term_months,
            note_photo: self.note_photo.clone(),
            note_photo_back: self.note_photo_back.clone(),
            notes: self.notes.clone(),
        }
    }

    /// Ghi đè thông tin không liên quan tới tiền
    pub fn apply_details(&mut self, details: LoanDetails, at: DateTime<Utc>) -> CoreResult<()> {
        if let Some(term) = details.term_months {
            ensure_term(term)?;
        }
        if let Some(due) = details.due_date {
            if due < self.start_date {
                return Err(CoreError::validation(format!(
                    "Due date {} is before start date {}",
                    due, self.start_date
                )));
            }
        }

        self.due_date = details.due_date.or_else(|| {
            details
                .term_months
                .and_then(|m| self.start_date.checked_add_months(Months::new(m)))
        });
        self.codebtor_id = details.codebtor_id;
        self.interest_timing = details.interest_timing;
        self.term_months = details.term_months;
        self.note_photo = details.note_photo;
        self.note_photo_back = details.note_photo_back;
        self.notes = details.notes;
        self.updated_at = at;
        Ok(())
    }

    /// Lãi tháng hiện tại trên dư nợ
    pub fn monthly_interest(&self) -> Decimal {
        monthly_interest(self.balance, self.rate_percent)
    }

    pub fn is_open(&self) -> bool {
        self.status == LoanStatus::Active
    }

    /// Lỗi nếu khoản vay không còn nhận thanh toán
    pub fn ensure_open(&self) -> CoreResult<()> {
        if !self.is_open() {
            return Err(CoreError::LoanNotOpen {
                code: self.code.clone(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Trừ phần gốc vào dư nợ; dư nợ về 0 thì chuyển sang Paid
    pub fn apply_principal(&mut self, principal: Decimal, at: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_open()?;
        if principal < Decimal::ZERO {
            return Err(CoreError::InvalidAmount(format!(
                "Principal cannot be negative: {}",
                principal
            )));
        }
        if principal > self.balance {
            return Err(CoreError::PrincipalExceedsBalance {
                principal,
                balance: self.balance,
            });
        }

        self.balance -= principal;
        if self.balance.is_zero() {
            self.status = LoanStatus::Paid;
            self.paid_at = Some(at);
        }
        self.updated_at = at;
        Ok(())
    }

    /// Hoàn lại phần gốc khi hủy thanh toán; Paid quay về Active nếu còn dư nợ
    pub fn restore_principal(&mut self, principal: Decimal, at: DateTime<Utc>) -> CoreResult<()> {
        if self.status == LoanStatus::Cancelled {
            return Err(CoreError::LoanNotOpen {
                code: self.code.clone(),
                status: self.status.to_string(),
            });
        }

        self.balance += principal;
        if self.status == LoanStatus::Paid && self.balance > Decimal::ZERO {
            self.status = LoanStatus::Active;
            self.paid_at = None;
        }
        self.updated_at = at;
        Ok(())
    }

    /// Hủy khoản vay đang hoạt động
    pub fn cancel(&mut self, reason: &str, at: DateTime<Utc>) -> CoreResult<()> {
        if reason.trim().is_empty() {
            return Err(CoreError::validation("A cancellation reason is required"));
        }
        if self.status != LoanStatus::Active {
            return Err(CoreError::LoanNotCancellable(self.code.clone()));
        }
        self.status = LoanStatus::Cancelled;
        self.cancel_reason = Some(reason.trim().to_string());
        self.updated_at = at;
        Ok(())
    }

    /// Số ngày quá hạn (0 nếu chưa tới hạn hoặc không có ngày đáo hạn)
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        match self.due_date {
            Some(due) if self.is_open() => (today - due).num_days().max(0),
            _ => 0,
        }
    }

    /// Tình trạng tại ngày `today`
    pub fn standing(&self, today: NaiveDate, delinquency_days: i64) -> LoanStanding {
        match self.status {
            LoanStatus::Paid => LoanStanding::Paid,
            LoanStatus::Cancelled => LoanStanding::Cancelled,
            LoanStatus::Active => {
                let days = self.days_overdue(today);
                if days > delinquency_days {
                    LoanStanding::Delinquent
                } else if days > 0 {
                    LoanStanding::Overdue
                } else {
                    LoanStanding::Active
                }
            }
        }
    }

    /// Đáo hạn trong khoảng [today, today + days]
    pub fn is_due_within(&self, today: NaiveDate, days: i64) -> bool {
        match self.due_date {
            Some(due) if self.is_open() => {
                due >= today && (due - today).num_days() <= days
            }
            _ => false,
        }
    }
}

impl fmt::Display for Loan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loan {} (balance: {}, rate: {}%, status: {})",
            self.code, self.balance, self.rate_percent, self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_loan(amount: Decimal) -> NewLoan {
        NewLoan {
            client_id: 1,
            lender_code: "PRE001".to_string(),
            codebtor_id: None,
            initial_amount: amount,
            rate_percent: Some(dec!(5)),
            interest_timing: InterestTiming::Due,
            start_date: date(2026, 1, 15),
            due_date: None,
            term_months: Some(6),
            note_photo: None,
            note_photo_back: None,
            notes: String::new(),
        }
    }

    fn open_loan(amount: Decimal) -> Loan {
        Loan::open(1, "PR000001".to_string(), &new_loan(amount), dec!(5))
    }

    #[test]
    fn test_minimum_amount() {
        let err = new_loan(dec!(40000)).validate(dec!(50000)).unwrap_err();
        assert!(matches!(err, CoreError::BelowMinimum { .. }));
        assert!(new_loan(dec!(50000)).validate(dec!(50000)).is_ok());
    }

    #[test]
    fn test_amount_must_fit_currency() {
        let err = new_loan(dec!(50000000000000000000000000000))
            .validate(dec!(50000))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount(_)));

        let err = new_loan(dec!(50000.005)).validate(dec!(50000)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount(_)));

        let mut long = new_loan(dec!(100000));
        long.term_months = Some(601);
        assert!(long.validate(dec!(50000)).is_err());
        long.term_months = Some(0);
        assert!(long.validate(dec!(50000)).is_err());
    }

    #[test]
    fn test_due_date_from_term() {
        let loan = new_loan(dec!(100000));
        assert_eq!(loan.effective_due_date(), Some(date(2026, 7, 15)));

        let mut explicit = new_loan(dec!(100000));
        explicit.due_date = Some(date(2026, 3, 1));
        assert_eq!(explicit.effective_due_date(), Some(date(2026, 3, 1)));

        explicit.due_date = Some(date(2025, 12, 1));
        assert!(explicit.validate(dec!(50000)).is_err());
    }

    #[test]
    fn test_open_sets_balance_and_status() {
        let loan = open_loan(dec!(1000000));
        assert_eq!(loan.balance, dec!(1000000));
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.monthly_interest(), dec!(50000.00));
    }

    #[test]
    fn test_apply_and_restore_principal() {
        let mut loan = open_loan(dec!(100000));
        let now = Utc::now();

        loan.apply_principal(dec!(40000), now).unwrap();
        assert_eq!(loan.balance, dec!(60000));
        assert_eq!(loan.status, LoanStatus::Active);

        loan.apply_principal(dec!(60000), now).unwrap();
        assert_eq!(loan.balance, dec!(0));
        assert_eq!(loan.status, LoanStatus::Paid);
        assert!(loan.paid_at.is_some());

        // Paid loans accept no more payments
        assert!(loan.apply_principal(dec!(1), now).is_err());

        loan.restore_principal(dec!(60000), now).unwrap();
        assert_eq!(loan.balance, dec!(60000));
        assert_eq!(loan.status, LoanStatus::Active);
        assert!(loan.paid_at.is_none());
    }

    #[test]
    fn test_overpaying_principal_fails() {
        let mut loan = open_loan(dec!(100000));
        let err = loan.apply_principal(dec!(100001), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::PrincipalExceedsBalance { .. }));
        assert_eq!(loan.balance, dec!(100000));
    }

    #[test]
    fn test_cancel() {
        let mut loan = open_loan(dec!(100000));
        assert!(loan.cancel("  ", Utc::now()).is_err());
        loan.cancel("Client withdrew", Utc::now()).unwrap();
        assert_eq!(loan.status, LoanStatus::Cancelled);

        let err = loan.cancel("again", Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::LoanNotCancellable(_)));
        assert!(loan.restore_principal(dec!(10), Utc::now()).is_err());
    }

    #[test]
    fn test_apply_details_keeps_amounts() {
        let mut loan = open_loan(dec!(100000));
        loan.apply_principal(dec!(30000), Utc::now()).unwrap();

        let mut details = loan.details();
        details.due_date = None;
        details.term_months = Some(12);
        details.notes = "Renegotiated".to_string();
        loan.apply_details(details, Utc::now()).unwrap();

        assert_eq!(loan.due_date, Some(date(2027, 1, 15)));
        assert_eq!(loan.notes, "Renegotiated");
        assert_eq!(loan.balance, dec!(70000));
        assert_eq!(loan.initial_amount, dec!(100000));
        assert_eq!(loan.rate_percent, dec!(5));

        let mut early = loan.details();
        early.due_date = Some(date(2025, 1, 1));
        assert!(loan.apply_details(early, Utc::now()).is_err());
        assert_eq!(loan.due_date, Some(date(2027, 1, 15)));
    }

    #[test]
    fn test_standing_is_date_driven() {
        let loan = open_loan(dec!(100000)); // due 2026-07-15
        assert_eq!(loan.standing(date(2026, 7, 15), 30), LoanStanding::Active);
        assert_eq!(loan.standing(date(2026, 7, 16), 30), LoanStanding::Overdue);
        assert_eq!(loan.days_overdue(date(2026, 8, 14)), 30);
        assert_eq!(loan.standing(date(2026, 8, 14), 30), LoanStanding::Overdue);
        assert_eq!(loan.standing(date(2026, 8, 15), 30), LoanStanding::Delinquent);
    }

    #[test]
    fn test_due_within() {
        let loan = open_loan(dec!(100000)); // due 2026-07-15
        assert!(loan.is_due_within(date(2026, 7, 10), 7));
        assert!(!loan.is_due_within(date(2026, 7, 1), 7));
        assert!(!loan.is_due_within(date(2026, 7, 16), 7));
    }

    #[test]
    fn test_status_roundtrip_strings() {
        for standing in LoanStanding::all() {
            assert_eq!(LoanStanding::from_str(standing.as_str()), Some(standing));
        }
        assert_eq!(LoanStatus::from_str("PAID"), Some(LoanStatus::Paid));
        assert_eq!(InterestTiming::from_str("anticipated"), Some(InterestTiming::Anticipated));
    }
}
