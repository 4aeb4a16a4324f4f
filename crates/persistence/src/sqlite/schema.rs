//! Database schema definitions
//!
//! Row types cho sqlx mapping từ SQLite tables.
//! Schema được định nghĩa trong migrations/20261019000000_init.sql

use crate::error::{PersistenceError, PersistenceResult};
use chrono::{DateTime, NaiveDate, Utc};
use lendbook_core::{
    Client, CoDebtor, InterestTiming, Lender, Loan, LoanStatus, Payment, PaymentKind,
    PaymentMethod,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Row type cho bảng `lenders`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct LenderRow {
    pub code: String,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub default_rate: String, // Decimal stored as TEXT
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Row type cho bảng `clients`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ClientRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub primary_address: String,
    pub secondary_address: String,
    pub phone: String,
    pub alternate_phone: String,
    pub email: String,
    pub notes: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row type cho bảng `codebtors`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct CoDebtorRow {
    pub id: i64,
    pub client_id: i64,
    pub full_name: String,
    pub national_id: String,
    pub phone: String,
    pub address: String,
    pub relationship: String,
    pub created_at: DateTime<Utc>,
}

/// Row type cho bảng `loans`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct LoanRow {
    pub id: i64,
    pub code: String,
    pub client_id: i64,
    pub lender_code: String,
    pub codebtor_id: Option<i64>,
    pub initial_amount: String, // Decimal stored as TEXT
    pub balance: String,        // Decimal stored as TEXT
    pub rate_percent: String,   // Decimal stored as TEXT
    pub interest_timing: String,
    pub start_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub term_months: Option<i64>,
    pub note_photo: Option<String>,
    pub note_photo_back: Option<String>,
    pub notes: String,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row type cho bảng `payments`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PaymentRow {
    pub id: i64,
    pub receipt: String,
    pub loan_id: i64,
    pub total: String,     // Decimal stored as TEXT
    pub interest: String,  // Decimal stored as TEXT
    pub principal: String, // Decimal stored as TEXT
    pub kind: String,
    pub method: String,
    pub date: NaiveDate,
    pub reference: String,
    pub notes: String,
    pub receipt_scan: Option<String>,
    pub receipt_printed: bool,
    pub voided: bool,
    pub voided_at: Option<DateTime<Utc>>,
    pub void_reason: String,
    pub voided_by: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Row type cho bảng `code_sequences`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct SequenceRow {
    pub kind: String,
    pub prefix: String,
    pub last_code: Option<String>,
}

// === Conversion helpers ===

/// Parse Decimal lưu dạng TEXT
pub(crate) fn parse_decimal(field: &str, value: &str) -> PersistenceResult<Decimal> {
    Decimal::from_str(value).map_err(|_| PersistenceError::InvalidDecimal {
        field: field.to_string(),
        value: value.to_string(),
    })
}

// === Conversion implementations ===

impl TryFrom<LenderRow> for Lender {
    type Error = PersistenceError;

    fn try_from(row: LenderRow) -> PersistenceResult<Self> {
        Ok(Self {
            default_rate: parse_decimal("default_rate", &row.default_rate)?,
            code: row.code,
            first_name: row.first_name,
            last_name: row.last_name,
            national_id: row.national_id,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            national_id: row.national_id,
            primary_address: row.primary_address,
            secondary_address: row.secondary_address,
            phone: row.phone,
            alternate_phone: row.alternate_phone,
            email: row.email,
            notes: row.notes,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<CoDebtorRow> for CoDebtor {
    fn from(row: CoDebtorRow) -> Self {
        Self {
            id: row.id,
            client_id: row.client_id,
            full_name: row.full_name,
            national_id: row.national_id,
            phone: row.phone,
            address: row.address,
            relationship: row.relationship,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<LoanRow> for Loan {
    type Error = PersistenceError;

    fn try_from(row: LoanRow) -> PersistenceResult<Self> {
        let interest_timing = InterestTiming::from_str(&row.interest_timing)
            .ok_or_else(|| PersistenceError::invalid_enum("interest_timing", &row.interest_timing))?;
        let status = LoanStatus::from_str(&row.status)
            .ok_or_else(|| PersistenceError::invalid_enum("status", &row.status))?;
        let term_months = row
            .term_months
            .map(|m| {
                u32::try_from(m).map_err(|_| {
                    PersistenceError::Other(format!("Invalid term_months on {}: {}", row.code, m))
                })
            })
            .transpose()?;

        Ok(Self {
            initial_amount: parse_decimal("initial_amount", &row.initial_amount)?,
            balance: parse_decimal("balance", &row.balance)?,
            rate_percent: parse_decimal("rate_percent", &row.rate_percent)?,
            interest_timing,
            status,
            term_months,
            id: row.id,
            code: row.code,
            client_id: row.client_id,
            lender_code: row.lender_code,
            codebtor_id: row.codebtor_id,
            start_date: row.start_date,
            due_date: row.due_date,
            note_photo: row.note_photo,
            note_photo_back: row.note_photo_back,
            notes: row.notes,
            paid_at: row.paid_at,
            cancel_reason: row.cancel_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<PaymentRow> for Payment {
    type Error = PersistenceError;

    fn try_from(row: PaymentRow) -> PersistenceResult<Self> {
        let kind = PaymentKind::from_str(&row.kind)
            .ok_or_else(|| PersistenceError::invalid_enum("kind", &row.kind))?;
        let method = PaymentMethod::from_str(&row.method)
            .ok_or_else(|| PersistenceError::invalid_enum("method", &row.method))?;

        Ok(Self {
            total: parse_decimal("total", &row.total)?,
            interest: parse_decimal("interest", &row.interest)?,
            principal: parse_decimal("principal", &row.principal)?,
            kind,
            method,
            id: row.id,
            receipt: row.receipt,
            loan_id: row.loan_id,
            date: row.date,
            reference: row.reference,
            notes: row.notes,
            receipt_scan: row.receipt_scan,
            receipt_printed: row.receipt_printed,
            voided: row.voided,
            voided_at: row.voided_at,
            void_reason: row.void_reason,
            voided_by: row.voided_by,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn payment_row() -> PaymentRow {
        PaymentRow {
            id: 7,
            receipt: "REC00000007".to_string(),
            loan_id: 2,
            total: "60000.00".to_string(),
            interest: "10000.00".to_string(),
            principal: "50000.00".to_string(),
            kind: "mixed".to_string(),
            method: "transfer".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            reference: "TRX-991".to_string(),
            notes: String::new(),
            receipt_scan: None,
            receipt_printed: false,
            voided: false,
            voided_at: None,
            void_reason: String::new(),
            voided_by: None,
            created_by: "cashier".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_payment_row_conversion() {
        let payment = Payment::try_from(payment_row()).unwrap();
        assert_eq!(payment.total, dec!(60000));
        assert_eq!(payment.kind, PaymentKind::Mixed);
        assert_eq!(payment.method, PaymentMethod::Transfer);
    }

    #[test]
    fn test_bad_values_are_rejected() {
        let mut row = payment_row();
        row.total = "sixty".to_string();
        assert!(matches!(
            Payment::try_from(row),
            Err(PersistenceError::InvalidDecimal { .. })
        ));

        let mut row = payment_row();
        row.method = "bitcoin".to_string();
        assert!(matches!(
            Payment::try_from(row),
            Err(PersistenceError::InvalidEnumValue { .. })
        ));
    }
}
