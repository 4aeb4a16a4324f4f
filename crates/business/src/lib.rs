//! # Lendbook Business
//!
//! Business logic layer - registry, loans, payments and reports.
//!
//! Every service borrows a [`ServiceContext`] holding the pool, the event
//! store and the ledger settings.
//!
//! ```rust,ignore
//! let ctx = ServiceContext::new(&db, LedgerSettings::default());
//! let loan = LoanService::new(&ctx).create_loan("cashier", new_loan).await?;
//! let payment = PaymentService::new(&ctx).record_payment("cashier", new_payment).await?;
//! ```

pub mod error;
pub mod loans;
pub mod payments;
pub mod registry;
pub mod reports;
pub mod services;

pub use error::{BusinessError, BusinessResult};
pub use loans::{LoanFilter, LoanOverview, LoanService, LoanSummary};
pub use payments::{PaymentList, PaymentService, PaymentTotals, PaymentView};
pub use registry::RegistryService;
pub use reports::{
    ClientDebt, DailyReport, Dashboard, DayTotal, LoansReport, MethodBreakdown, PaymentStats,
    ReportService, StandingCount, StandingGroup,
};
pub use services::ServiceContext;

pub use lendbook_persistence::{ClientQuery, PaymentQuery};
