//! # Event Module
//!
//! Định nghĩa Event và EventType cho audit trail.
//! Events được ghi vào JSONL files, mỗi thao tác ghi sổ một dòng.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Loại sự kiện trong hệ thống.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // === Registry events ===
    LenderCreated,
    ClientCreated,
    ClientUpdated,
    ClientDeactivated,
    CoDebtorAdded,

    // === Loan events ===
    LoanCreated,
    /// Sửa thông tin không liên quan tới tiền
    LoanUpdated,
    /// Dư nợ về 0
    LoanPaidOff,
    LoanCancelled,

    // === Payment events ===
    PaymentRecorded,
    PaymentVoided,
    ReceiptPrinted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::LenderCreated => "lender_created",
            EventType::ClientCreated => "client_created",
            EventType::ClientUpdated => "client_updated",
            EventType::ClientDeactivated => "client_deactivated",
            EventType::CoDebtorAdded => "codebtor_added",
            EventType::LoanCreated => "loan_created",
            EventType::LoanUpdated => "loan_updated",
            EventType::LoanPaidOff => "loan_paid_off",
            EventType::LoanCancelled => "loan_cancelled",
            EventType::PaymentRecorded => "payment_recorded",
            EventType::PaymentVoided => "payment_voided",
            EventType::ReceiptPrinted => "receipt_printed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let all = [
            EventType::LenderCreated,
            EventType::ClientCreated,
            EventType::ClientUpdated,
            EventType::ClientDeactivated,
            EventType::CoDebtorAdded,
            EventType::LoanCreated,
            EventType::LoanUpdated,
            EventType::LoanPaidOff,
            EventType::LoanCancelled,
            EventType::PaymentRecorded,
            EventType::PaymentVoided,
            EventType::ReceiptPrinted,
        ];
        all.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Event chính - đại diện cho một sự kiện đã xảy ra trong hệ thống.
///
/// Events là immutable, append-only, và được lưu vào JSONL files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// ID unique của event (EVT_000001, ...)
    pub event_id: String,
    /// Thời điểm xảy ra
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,

    /// Người thực hiện
    pub actor_id: String,

    // === Target ===
    /// Mã đối tượng chính (mã khoản vay, số biên nhận, id client, mã lender)
    pub entity_id: String,
    /// Khoản vay liên quan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_code: Option<String>,

    // === Amount ===
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Decimal>,
    /// Dư nợ sau thao tác
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_after: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Event {
    /// Tạo Event mới với thông tin cơ bản
    pub fn new(event_id: String, event_type: EventType, actor_id: &str, entity_id: &str) -> Self {
        Self {
            event_id,
            timestamp: Utc::now(),
            event_type,
            actor_id: actor_id.to_string(),
            entity_id: entity_id.to_string(),
            loan_code: None,
            amount: None,
            interest: None,
            principal: None,
            balance_after: None,
            description: None,
        }
    }

    // === Builder methods ===

    pub fn with_loan(mut self, loan_code: &str) -> Self {
        self.loan_code = Some(loan_code.to_string());
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_split(mut self, interest: Decimal, principal: Decimal) -> Self {
        self.interest = Some(interest);
        self.principal = Some(principal);
        self
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance_after = Some(balance);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    // === Factory methods ===

    /// Tạo LoanCreated event
    pub fn loan_created(event_id: &str, actor_id: &str, loan_code: &str, amount: Decimal) -> Self {
        Self::new(event_id.to_string(), EventType::LoanCreated, actor_id, loan_code)
            .with_loan(loan_code)
            .with_amount(amount)
            .with_balance(amount)
    }

    /// Tạo PaymentRecorded event
    #[allow(clippy::too_many_arguments)]
    pub fn payment_recorded(
        event_id: &str,
        actor_id: &str,
        receipt: &str,
        loan_code: &str,
        total: Decimal,
        interest: Decimal,
        principal: Decimal,
        balance_after: Decimal,
    ) -> Self {
        Self::new(event_id.to_string(), EventType::PaymentRecorded, actor_id, receipt)
            .with_loan(loan_code)
            .with_amount(total)
            .with_split(interest, principal)
            .with_balance(balance_after)
    }

    /// Tạo PaymentVoided event
    pub fn payment_voided(
        event_id: &str,
        actor_id: &str,
        receipt: &str,
        loan_code: &str,
        principal: Decimal,
        balance_after: Decimal,
        reason: &str,
    ) -> Self {
        Self::new(event_id.to_string(), EventType::PaymentVoided, actor_id, receipt)
            .with_loan(loan_code)
            .with_split(Decimal::ZERO, principal)
            .with_balance(balance_after)
            .with_description(reason)
    }

    /// Generate ID cho event mới
    pub fn generate_id(counter: u64) -> String {
        format!("EVT_{:06}", counter)
    }

    /// Event có liên quan tới đối tượng `id` (mã chính hoặc khoản vay)
    pub fn concerns(&self, id: &str) -> bool {
        self.entity_id == id || self.loan_code.as_deref() == Some(id)
    }

    /// Serialize event thành JSON string (cho JSONL)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} by {} on {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.event_type,
            self.actor_id,
            self.entity_id
        )
    }
}
