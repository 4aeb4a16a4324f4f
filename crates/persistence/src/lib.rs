//! # Lendbook Persistence
//!
//! Persistence layer cho Lendbook - SQLite + JSONL Event Store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Database                               │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────────┐ │
//! │  │   SQLite    │    │    JSONL    │    │     Repos       │ │
//! │  │  (ledger)   │    │   (audit)   │    │   (queries)     │ │
//! │  └─────────────┘    └─────────────┘    └─────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lendbook_persistence::{Database, LoanQuery, LoanRepo};
//!
//! let db = Database::init_with_migrations("sqlite:lendbook.db", "data/events").await?;
//!
//! let loans = LoanRepo::list(db.pool(), &LoanQuery::new().lender("PRE001")).await?;
//!
//! db.events().append(&event)?;
//! ```

pub mod error;
pub mod events;
pub mod sqlite;

pub use error::{PersistenceError, PersistenceResult};
pub use events::{EventFilter, EventReader, EventStore};
pub use sqlite::{
    create_memory_pool, init_database, ClientQuery, ClientRepo, CoDebtorRepo, LenderRepo,
    LoanQuery, LoanRepo, PaymentQuery, PaymentRepo, SequenceRepo,
};

use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

/// Database facade - unified access to SQLite + Events
pub struct Database {
    pool: SqlitePool,
    event_store: Arc<EventStore>,
}

impl Database {
    /// Mở database có sẵn
    ///
    /// # Arguments
    /// * `db_url` - SQLite database URL (e.g., "sqlite:lendbook.db")
    /// * `events_path` - Path to JSONL events directory
    pub async fn new<Q: AsRef<Path>>(db_url: &str, events_path: Q) -> PersistenceResult<Self> {
        let pool = sqlite::create_pool(db_url).await?;
        let event_store = Arc::new(EventStore::new(events_path)?);

        Ok(Self { pool, event_store })
    }

    /// Tạo database (nếu chưa có) và chạy migrations
    pub async fn init_with_migrations<Q: AsRef<Path>>(
        db_url: &str,
        events_path: Q,
    ) -> PersistenceResult<Self> {
        let pool = init_database(db_url).await?;
        let event_store = Arc::new(EventStore::new(events_path)?);

        Ok(Self { pool, event_store })
    }

    /// Database trong bộ nhớ, events ghi vào `events_path`
    pub async fn in_memory<Q: AsRef<Path>>(events_path: Q) -> PersistenceResult<Self> {
        let pool = create_memory_pool().await?;
        let event_store = Arc::new(EventStore::new(events_path)?);

        Ok(Self { pool, event_store })
    }

    /// Get SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get event store
    pub fn events(&self) -> &EventStore {
        &self.event_store
    }

    /// Event store dùng chung (cùng counter event ID)
    pub fn shared_events(&self) -> Arc<EventStore> {
        Arc::clone(&self.event_store)
    }

    /// Event reader cho audit
    pub fn event_reader(&self) -> EventReader {
        EventReader::new(self.event_store.base_path())
    }
}
