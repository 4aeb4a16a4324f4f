//! SQLite persistence module
//!
//! Repository pattern cho SQLite database access.

pub mod repos;
pub mod schema;

pub use repos::{
    create_memory_pool, create_pool, init_database, run_migrations, ClientQuery, ClientRepo,
    CoDebtorRepo, LenderRepo, LoanQuery, LoanRepo, PaymentQuery, PaymentRepo, SequenceRepo,
};
pub use schema::{ClientRow, CoDebtorRow, LenderRow, LoanRow, PaymentRow, SequenceRow};
