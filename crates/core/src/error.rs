//! # Error Module
//!
//! Định nghĩa các domain errors cho Lendbook sử dụng thiserror.

use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Nhóm lỗi mà tầng gọi (CLI, HTTP) cần phân biệt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Sai dữ liệu đầu vào hoặc vi phạm quy tắc nghiệp vụ
    Validation,
    /// Không tìm thấy đối tượng được tham chiếu
    NotFound,
    /// Xung đột khi ghi đồng thời (có thể thử lại)
    Conflict,
    /// Thao tác không hợp lệ với trạng thái hiện tại
    State,
    /// Lỗi hạ tầng (database, IO)
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::State => "state",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Core domain errors.
///
/// Các lỗi nghiệp vụ cốt lõi, không liên quan đến infrastructure.
#[derive(Debug, Error)]
pub enum CoreError {
    // === Amount errors ===
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Loan amount {amount} is below the minimum of {minimum}")]
    BelowMinimum { amount: Decimal, minimum: Decimal },

    #[error("Interest ({interest}) plus principal ({principal}) must equal the total ({total})")]
    AllocationMismatch {
        interest: Decimal,
        principal: Decimal,
        total: Decimal,
    },

    #[error("Principal payment ({principal}) exceeds the outstanding balance ({balance})")]
    PrincipalExceedsBalance { principal: Decimal, balance: Decimal },

    // === State errors ===
    #[error("Loan {code} is {status}")]
    LoanNotOpen { code: String, status: String },

    #[error("Loan {0} cannot be cancelled")]
    LoanNotCancellable(String),

    // === Lookup errors ===
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    // === Validation errors ===
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Result type alias với CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Tạo NotFound error
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// Tạo ValidationError từ message
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// Phân loại lỗi
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::LoanNotOpen { .. } | CoreError::LoanNotCancellable(_) => ErrorKind::State,
            _ => ErrorKind::Validation,
        }
    }

    /// Kiểm tra có phải lỗi validation không
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_display() {
        let err = CoreError::AllocationMismatch {
            interest: dec!(40000),
            principal: dec!(50000),
            total: dec!(100000),
        };
        assert_eq!(
            err.to_string(),
            "Interest (40000) plus principal (50000) must equal the total (100000)"
        );

        let err = CoreError::not_found("Loan", "PR000001");
        assert_eq!(err.to_string(), "Loan not found: PR000001");
    }

    #[test]
    fn test_error_kinds() {
        let err = CoreError::BelowMinimum {
            amount: dec!(40000),
            minimum: dec!(50000),
        };
        assert!(err.is_validation());

        let err = CoreError::LoanNotOpen {
            code: "PR000001".to_string(),
            status: "paid".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::State);

        let err = CoreError::not_found("Client", "7");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
