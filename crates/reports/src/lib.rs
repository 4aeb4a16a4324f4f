//! # Lendbook Reports
//!
//! Report generation - CSV, JSON, Markdown.
//!
//! ## Exporters
//!
//! - [`CsvExporter`] - CSV format with proper escaping
//! - [`JsonExporter`] - JSON format (pretty or compact)
//! - [`MarkdownExporter`] - Markdown tables with a summary section
//!
//! ## Reports
//!
//! - [`DailyCollectionReport`] - payments of one day, by method
//! - [`PaymentListReport`] - filtered payment listing
//! - [`LoanPortfolioReport`] - loans of a date range by standing
//! - [`DashboardReport`] - portfolio figures and delinquent loans
//! - [`ScheduleReport`] - simulated repayment schedule
//! - [`AuditTrailReport`] - events from the audit log
//!
//! ## Example
//!
//! ```rust,ignore
//! use lendbook_reports::{DailyCollectionReport, MarkdownExporter, ReportExporter};
//!
//! let daily = ReportService::new(&ctx).daily_report(date).await?;
//! let output = MarkdownExporter::new().export(&DailyCollectionReport::new(daily));
//! ```

pub mod exporters;
pub mod ledger;

pub use exporters::{CsvExporter, JsonExporter, MarkdownExporter, ReportData, ReportExporter};
pub use ledger::{
    AuditTrailReport, DailyCollectionReport, DashboardReport, LoanPortfolioReport,
    PaymentListReport, ScheduleReport,
};
