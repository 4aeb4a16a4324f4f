//! # Settings Module
//!
//! Cấu hình nghiệp vụ: số tiền vay tối thiểu, prefix của các dãy mã,
//! ngưỡng nợ xấu. Đọc từ file JSON, thiếu trường nào thì dùng mặc định.

use crate::code::{CodeSequence, SequenceKind};
use crate::error::{CoreError, CoreResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cấu hình sổ cho vay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Số tiền vay tối thiểu
    pub minimum_loan_amount: Decimal,
    pub loan_prefix: String,
    pub receipt_prefix: String,
    pub lender_prefix: String,
    /// Quá hạn hơn số ngày này thì tính là nợ xấu
    pub delinquency_days: i64,
    /// Cửa sổ "sắp đáo hạn" mặc định
    pub due_soon_days: i64,
    /// Số lần thử lại khi xung đột ghi
    pub max_conflict_retries: u32,
    /// Giới hạn số dòng của danh sách
    pub list_limit: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            minimum_loan_amount: Decimal::new(50_000, 0),
            loan_prefix: "PR".to_string(),
            receipt_prefix: "REC".to_string(),
            lender_prefix: "PRE".to_string(),
            delinquency_days: 30,
            due_soon_days: 7,
            max_conflict_retries: 3,
            list_limit: 50,
        }
    }
}

impl LedgerSettings {
    /// Đọc từ file JSON
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::validation(format!("Cannot read settings {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parse từ JSON string
    pub fn from_json(content: &str) -> CoreResult<Self> {
        let settings: Self = serde_json::from_str(content)
            .map_err(|e| CoreError::validation(format!("Invalid settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.minimum_loan_amount < Decimal::ZERO {
            return Err(CoreError::validation("minimum_loan_amount cannot be negative"));
        }
        for (name, prefix) in [
            ("loan_prefix", &self.loan_prefix),
            ("receipt_prefix", &self.receipt_prefix),
            ("lender_prefix", &self.lender_prefix),
        ] {
            if prefix.is_empty() || prefix.chars().any(|c| c.is_ascii_digit()) {
                return Err(CoreError::validation(format!(
                    "{} must be non-empty and contain no digits: {:?}",
                    name, prefix
                )));
            }
        }
        if self.delinquency_days < 0 || self.due_soon_days < 0 {
            return Err(CoreError::validation("Day thresholds cannot be negative"));
        }
        Ok(())
    }

    /// Dãy mã theo loại
    pub fn sequence(&self, kind: SequenceKind) -> CodeSequence {
        let prefix = match kind {
            SequenceKind::Loan => &self.loan_prefix,
            SequenceKind::Receipt => &self.receipt_prefix,
            SequenceKind::Lender => &self.lender_prefix,
        };
        CodeSequence::new(kind, prefix)
    }
}
