//! Business layer errors
//!
//! Wraps core and persistence errors and classifies every failure into an
//! [`ErrorKind`] so callers can tell bad input from missing records,
//! retryable conflicts and invalid state transitions.

use lendbook_core::{CoreError, ErrorKind};
use lendbook_persistence::PersistenceError;
use thiserror::Error;

/// Business operation errors
#[derive(Debug, Error)]
pub enum BusinessError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid state: {0}")]
    State(String),

    #[error("{operation} failed after {attempts} attempts due to concurrent writes")]
    Conflict { operation: String, attempts: u32 },

    // === Wrapped errors ===
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("{0}")]
    Core(#[from] CoreError),
}

/// Result type alias for business operations
pub type BusinessResult<T> = Result<T, BusinessError>;

impl From<sqlx::Error> for BusinessError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(PersistenceError::from(err))
    }
}

impl BusinessError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Phân loại lỗi cho tầng gọi
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::State(_) => ErrorKind::State,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Core(err) => err.kind(),
            Self::Persistence(err) if err.is_not_found() => ErrorKind::NotFound,
            Self::Persistence(err) if err.is_conflict() => ErrorKind::Conflict,
            Self::Persistence(err) if err.is_foreign_key_violation() => ErrorKind::Validation,
            Self::Persistence(_) => ErrorKind::Internal,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}
