//! # Payment Module
//!
//! Định nghĩa Payment - một lần thanh toán vào khoản vay, có số biên nhận.
//! Payment không bao giờ bị xóa; chỉ có thể hủy (void) đúng một lần.

use crate::allocation::Allocation;
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phương thức thanh toán
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Tiền mặt
    Cash,
    /// Chuyển khoản
    Transfer,
    /// Nộp tiền vào tài khoản (consignación)
    Deposit,
    Cheque,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Deposit => "deposit",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cash" => Some(PaymentMethod::Cash),
            "transfer" => Some(PaymentMethod::Transfer),
            "deposit" => Some(PaymentMethod::Deposit),
            "cheque" => Some(PaymentMethod::Cheque),
            "other" => Some(PaymentMethod::Other),
            _ => None,
        }
    }

    pub fn all() -> [PaymentMethod; 5] {
        [
            PaymentMethod::Cash,
            PaymentMethod::Transfer,
            PaymentMethod::Deposit,
            PaymentMethod::Cheque,
            PaymentMethod::Other,
        ]
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Loại thanh toán, suy ra từ phần chia
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    /// Chỉ trả lãi
    Interest,
    /// Chỉ trả gốc
    Principal,
    /// Lãi + gốc
    Mixed,
    /// Tất toán (gốc trả hết dư nợ)
    Full,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Interest => "interest",
            PaymentKind::Principal => "principal",
            PaymentKind::Mixed => "mixed",
            PaymentKind::Full => "full",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "interest" => Some(PaymentKind::Interest),
            "principal" => Some(PaymentKind::Principal),
            "mixed" => Some(PaymentKind::Mixed),
            "full" => Some(PaymentKind::Full),
            _ => None,
        }
    }

    /// Phân loại theo phần lãi/gốc và dư nợ trước khi trả
    pub fn classify(interest: Decimal, principal: Decimal, balance: Decimal) -> Self {
        if principal > Decimal::ZERO && principal == balance {
            PaymentKind::Full
        } else if interest > Decimal::ZERO && principal > Decimal::ZERO {
            PaymentKind::Mixed
        } else if interest > Decimal::ZERO {
            PaymentKind::Interest
        } else {
            PaymentKind::Principal
        }
    }
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dữ liệu ghi nhận thanh toán. Số biên nhận do hệ thống cấp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub loan_code: String,
    pub total: Decimal,
    pub interest: Option<Decimal>,
    pub principal: Option<Decimal>,
    #[serde(default)]
    pub method: PaymentMethod,
    pub date: NaiveDate,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub notes: String,
    /// Ảnh chứng từ, chỉ lưu tham chiếu
    pub receipt_scan: Option<String>,
}

/// Một lần thanh toán.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    /// Số biên nhận (REC00000001, ...)
    pub receipt: String,
    pub loan_id: i64,
    pub total: Decimal,
    pub interest: Decimal,
    pub principal: Decimal,
    pub kind: PaymentKind,
    pub method: PaymentMethod,
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

impl Payment {
    /// Tạo payment từ phần chia đã được duyệt
    pub fn record(
        id: i64,
        receipt: String,
        loan_id: i64,
        allocation: &Allocation,
        new: &NewPayment,
        actor: &str,
    ) -> Self {
        Self {
            id,
            receipt,
            loan_id,
            total: allocation.total,
            interest: allocation.interest,
            principal: allocation.principal,
            kind: allocation.kind,
            method: new.method,
            date: new.date,
            reference: new.reference.clone(),
            notes: new.notes.clone(),
            receipt_scan: new.receipt_scan.clone(),
            receipt_printed: false,
            voided: false,
            voided_at: None,
            void_reason: String::new(),
            voided_by: None,
            created_by: actor.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Hủy payment.
    ///
    /// Trả về `Ok(false)` nếu đã hủy trước đó (không đổi gì);
    /// lý do rỗng là lỗi validation.
    pub fn void(&mut self, reason: &str, actor: &str, at: DateTime<Utc>) -> CoreResult<bool> {
        if self.voided {
            return Ok(false);
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CoreError::validation("A void reason is required"));
        }
        self.voided = true;
        self.voided_at = Some(at);
        self.void_reason = reason.to_string();
        self.voided_by = Some(actor.to_string());
        Ok(true)
    }

    /// Số ngày kể từ ngày thanh toán
    pub fn days_since(&self, today: NaiveDate) -> i64 {
        (today - self.date).num_days()
    }
}

impl fmt::Display for Payment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} (interest {}, principal {}){}",
            self.receipt,
            self.total,
            self.interest,
            self.principal,
            if self.voided { " VOIDED" } else { "" }
        )
    }
}
