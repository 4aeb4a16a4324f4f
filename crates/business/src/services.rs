//! Service context and shared helpers
//!
//! Every service borrows a [`ServiceContext`], which owns the pool, the
//! shared event store and the ledger settings.

use crate::error::{BusinessError, BusinessResult};
use lendbook_core::{Client, Event, LedgerSettings, Loan};
use lendbook_persistence::{ClientRepo, Database, EventStore, LoanRepo};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Context for business operations - contains database access and settings
pub struct ServiceContext {
    pool: SqlitePool,
    events: Arc<EventStore>,
    settings: LedgerSettings,
}

impl ServiceContext {
    /// Create new service context from database
    pub fn new(db: &Database, settings: LedgerSettings) -> Self {
        Self {
            pool: db.pool().clone(),
            events: db.shared_events(),
            settings,
        }
    }

    /// Create from pool and event store directly
    pub fn from_parts(pool: SqlitePool, events: Arc<EventStore>, settings: LedgerSettings) -> Self {
        Self {
            pool,
            events,
            settings,
        }
    }

    /// Get database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get event store
    pub fn events(&self) -> &EventStore {
        &self.events
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Append an audit event built with a fresh event ID
    pub fn record_event<F>(&self, build: F) -> BusinessResult<Event>
    where
        F: FnOnce(&str) -> Event,
    {
        Ok(self.events.record(build)?)
    }

    /// Run `attempt` again while it fails with a write conflict.
    ///
    /// Each attempt must open and commit its own transaction. After
    /// `max_conflict_retries` retries the conflict is surfaced.
    pub async fn with_retry<T, F, Fut>(&self, operation: &str, mut attempt: F) -> BusinessResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BusinessResult<T>>,
    {
        let max_retries = self.settings.max_conflict_retries;
        let mut retries = 0u32;

        loop {
            match attempt().await {
                Err(err) if err.is_conflict() => {
                    if retries >= max_retries {
                        warn!(operation, attempts = retries + 1, "Giving up after write conflicts");
                        return Err(BusinessError::Conflict {
                            operation: operation.to_string(),
                            attempts: retries + 1,
                        });
                    }
                    retries += 1;
                    warn!(operation, retry = retries, error = %err, "Write conflict, retrying");
                    tokio::time::sleep(Duration::from_millis(5 * u64::from(retries))).await;
                }
                result => return result,
            }
        }
    }
}

/// Per-call cache of loans and client names, used when building list views
#[derive(Default)]
pub(crate) struct Directory {
    loans: HashMap<i64, Loan>,
    clients: HashMap<i64, Client>,
}

impl Directory {
    pub(crate) async fn loan(&mut self, pool: &SqlitePool, id: i64) -> BusinessResult<&Loan> {
        if !self.loans.contains_key(&id) {
            let loan = LoanRepo::get_by_id(pool, id).await?;
            self.loans.insert(id, loan);
        }
        self.loans
            .get(&id)
            .ok_or_else(|| BusinessError::not_found("Loan", &id.to_string()))
    }

    pub(crate) async fn client(&mut self, pool: &SqlitePool, id: i64) -> BusinessResult<&Client> {
        if !self.clients.contains_key(&id) {
            let client = ClientRepo::get_by_id(pool, id).await?;
            self.clients.insert(id, client);
        }
        self.clients
            .get(&id)
            .ok_or_else(|| BusinessError::not_found("Client", &id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lendbook_core::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::tempdir;

    async fn context(max_retries: u32) -> (ServiceContext, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::in_memory(dir.path()).await.unwrap();
        let settings = LedgerSettings {
            max_conflict_retries: max_retries,
            ..LedgerSettings::default()
        };
        (ServiceContext::new(&db, settings), dir)
    }

    fn conflict() -> BusinessError {
        BusinessError::Conflict {
            operation: "test".to_string(),
            attempts: 1,
        }
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let (ctx, _dir) = context(3).await;
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result = ctx
            .with_retry("test", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(conflict())
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();

        assert_eq!(result, 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_is_bounded() {
        let (ctx, _dir) = context(2).await;
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let err = ctx
            .with_retry("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(conflict())
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let (ctx, _dir) = context(3).await;
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let err = ctx
            .with_retry("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(BusinessError::validation("bad input"))
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
