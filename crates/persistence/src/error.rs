//! # Persistence Errors
//!
//! Error types cho persistence layer, wrapping sqlx và IO errors.
//! Unique violation và database busy/locked được xếp vào nhóm conflict
//! để tầng service có thể thử lại.

use thiserror::Error;

/// Mã lỗi SQLite (kể cả extended codes) của busy/locked
const SQLITE_BUSY_CODES: [&str; 5] = ["5", "6", "261", "262", "517"];

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    // === Database errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    // === Event store errors ===
    #[error("Event store IO error: {0}")]
    EventStoreIo(#[from] std::io::Error),

    #[error("Event serialization error: {0}")]
    EventSerialization(#[from] serde_json::Error),

    #[error("Event store lock poisoned")]
    EventStoreLock,

    // === Conversion errors ===
    #[error("Invalid decimal value: {field} = {value}")]
    InvalidDecimal { field: String, value: String },

    #[error("Invalid enum value: {field} = {value}")]
    InvalidEnumValue { field: String, value: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias cho PersistenceError
pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl PersistenceError {
    /// Tạo NotFound error
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid_enum(field: &str, value: &str) -> Self {
        Self::InvalidEnumValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Kiểm tra có phải lỗi not found không
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Unique violation, hoặc database đang bị khóa bởi writer khác
    pub fn is_conflict(&self) -> bool {
        let Self::Database(sqlx::Error::Database(db)) = self else {
            return false;
        };
        if db.is_unique_violation() {
            return true;
        }
        db.code()
            .map_or(false, |code| SQLITE_BUSY_CODES.iter().any(|c| *c == code))
    }

    /// Vi phạm khóa ngoại (tham chiếu tới bản ghi không tồn tại)
    pub fn is_foreign_key_violation(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(db)) => db.is_foreign_key_violation(),
            _ => false,
        }
    }
}
