//! Exportable ledger reports
//!
//! Each type wraps a result of the reporting services and implements
//! [`ReportData`], so it can be written with any exporter.

use crate::exporters::ReportData;
use chrono::{DateTime, NaiveDate, Utc};
use lendbook_business::{DailyReport, Dashboard, LoanOverview, LoansReport, PaymentList, PaymentView};
use lendbook_core::{Event, Schedule};
use rust_decimal::Decimal;

fn opt_decimal(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn opt_date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

fn kv(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

fn payment_headers() -> Vec<String> {
    ["Receipt", "Date", "Loan", "Client", "Method", "Total", "Interest", "Principal", "Voided"]
        .iter()
        .map(|h| h.to_string())
        .collect()
}

fn payment_row(view: &PaymentView) -> Vec<String> {
    let p = &view.payment;
    vec![
        p.receipt.clone(),
        p.date.to_string(),
        view.loan_code.clone(),
        view.client_name.clone(),
        p.method.to_string(),
        p.total.to_string(),
        p.interest.to_string(),
        p.principal.to_string(),
        if p.voided { "yes" } else { "" }.to_string(),
    ]
}

fn loan_headers() -> Vec<String> {
    [
        "Code", "Client", "Lender", "Start", "Due", "Amount", "Rate %", "Balance", "Standing",
        "Days overdue",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect()
}

fn loan_row(item: &LoanOverview) -> Vec<String> {
    let loan = &item.loan;
    vec![
        loan.code.clone(),
        item.client_name.clone(),
        loan.lender_code.clone(),
        loan.start_date.to_string(),
        opt_date(loan.due_date),
        loan.initial_amount.to_string(),
        loan.rate_percent.to_string(),
        loan.balance.to_string(),
        item.standing.to_string(),
        item.days_overdue.to_string(),
    ]
}

// ============================================================================
// Daily collections
// ============================================================================

/// Payments received on one day
pub struct DailyCollectionReport {
    pub title: String,
    pub report: DailyReport,
    pub generated_at: DateTime<Utc>,
}

impl DailyCollectionReport {
    pub fn new(report: DailyReport) -> Self {
        Self {
            title: format!("Daily Collections {}", report.date),
            report,
            generated_at: Utc::now(),
        }
    }
}

impl ReportData for DailyCollectionReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        payment_headers()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.report.payments.iter().map(payment_row).collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        let totals = &self.report.totals;
        let mut summary = vec![
            kv("Date", self.report.date),
            kv("Payments", totals.count),
            kv("Total", totals.total),
            kv("Interest", totals.interest),
            kv("Principal", totals.principal),
        ];
        for method in &self.report.by_method {
            summary.push(kv(
                &format!("By {}", method.method),
                format!("{} ({})", method.total, method.count),
            ));
        }
        summary.push(kv("Generated At", self.generated_at.to_rfc3339()));
        summary
    }

    fn numeric_columns(&self) -> Vec<usize> {
        vec![5, 6, 7]
    }
}

// ============================================================================
// Payment listing
// ============================================================================

/// A filtered payment listing with its totals
pub struct PaymentListReport {
    pub title: String,
    pub list: PaymentList,
    pub generated_at: DateTime<Utc>,
}

impl PaymentListReport {
    pub fn new(title: &str, list: PaymentList) -> Self {
        Self {
            title: title.to_string(),
            list,
            generated_at: Utc::now(),
        }
    }
}

impl ReportData for PaymentListReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        payment_headers()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.list.items.iter().map(payment_row).collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        let totals = &self.list.totals;
        vec![
            kv("Rows", self.list.items.len()),
            kv("Valid payments", totals.count),
            kv("Total", totals.total),
            kv("Interest", totals.interest),
            kv("Principal", totals.principal),
            kv("Generated At", self.generated_at.to_rfc3339()),
        ]
    }

    fn numeric_columns(&self) -> Vec<usize> {
        vec![5, 6, 7]
    }
}

// ============================================================================
// Loans by standing
// ============================================================================

/// Loans started in a date range, grouped by standing
pub struct LoanPortfolioReport {
    pub title: String,
    pub report: LoansReport,
    pub generated_at: DateTime<Utc>,
}

impl LoanPortfolioReport {
    pub fn new(report: LoansReport) -> Self {
        let title = match &report.lender_code {
            Some(code) => format!("Loans {} to {} ({})", report.from, report.to, code),
            None => format!("Loans {} to {}", report.from, report.to),
        };
        Self {
            title,
            report,
            generated_at: Utc::now(),
        }
    }
}

impl ReportData for LoanPortfolioReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        loan_headers()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.report
            .groups
            .iter()
            .flat_map(|group| group.loans.iter().map(loan_row))
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        let mut summary = vec![
            kv("Loans", self.report.total_count),
            kv("Lent", self.report.total_lent),
            kv("Outstanding", self.report.total_outstanding),
        ];
        for group in &self.report.groups {
            summary.push(kv(
                &format!("{}", group.standing),
                format!("{} loans, lent {}, outstanding {}", group.count, group.lent, group.outstanding),
            ));
        }
        summary.push(kv("Generated At", self.generated_at.to_rfc3339()));
        summary
    }

    fn numeric_columns(&self) -> Vec<usize> {
        vec![5, 6, 7, 9]
    }
}

// ============================================================================
// Dashboard
// ============================================================================

/// Portfolio dashboard; the rows are the delinquent loans
pub struct DashboardReport {
    pub title: String,
    pub dashboard: Dashboard,
}

impl DashboardReport {
    pub fn new(dashboard: Dashboard) -> Self {
        let title = match &dashboard.lender_code {
            Some(code) => format!("Dashboard {} ({})", dashboard.today, code),
            None => format!("Dashboard {}", dashboard.today),
        };
        Self { title, dashboard }
    }
}

impl ReportData for DashboardReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        loan_headers()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.dashboard.delinquent.iter().map(loan_row).collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        let d = &self.dashboard;
        let mut summary = vec![
            kv("Loans", d.total_loans),
            kv("Outstanding", d.total_outstanding),
            kv("Active clients", d.active_clients),
        ];
        for count in &d.by_standing {
            summary.push(kv(
                &format!("{}", count.standing),
                format!("{} ({})", count.count, count.balance),
            ));
        }
        summary.push(kv("Due soon", d.due_soon.len()));
        summary.push(kv(
            "Collected today",
            format!("{} ({} payments)", d.today_payments.total, d.today_payments.count),
        ));
        for (rank, debtor) in d.top_debtors.iter().enumerate() {
            summary.push(kv(
                &format!("Top debtor {}", rank + 1),
                format!("{} - {}", debtor.client_name, debtor.outstanding),
            ));
        }
        summary
    }

    fn numeric_columns(&self) -> Vec<usize> {
        vec![5, 6, 7, 9]
    }
}

// ============================================================================
// Amortization schedule
// ============================================================================

/// Simulated repayment schedule
pub struct ScheduleReport {
    pub title: String,
    pub schedule: Schedule,
}

impl ScheduleReport {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            title: format!(
                "Simulation {} at {}% over {} months",
                schedule.principal, schedule.rate_percent, schedule.term_months
            ),
            schedule,
        }
    }
}

impl ReportData for ScheduleReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        ["Month", "Installment", "Interest", "Principal", "Balance"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.schedule
            .rows
            .iter()
            .map(|r| {
                vec![
                    r.month.to_string(),
                    r.installment.to_string(),
                    r.interest.to_string(),
                    r.principal.to_string(),
                    r.balance.to_string(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        vec![
            kv("Principal", self.schedule.principal),
            kv("Monthly interest", self.schedule.monthly_interest),
            kv("Total interest", self.schedule.total_interest),
            kv("Total to pay", self.schedule.total_to_pay),
        ]
    }

    fn numeric_columns(&self) -> Vec<usize> {
        vec![0, 1, 2, 3, 4]
    }
}

// ============================================================================
// Audit trail
// ============================================================================

/// Events read back from the event store
pub struct AuditTrailReport {
    pub title: String,
    pub events: Vec<Event>,
    pub generated_at: DateTime<Utc>,
}

impl AuditTrailReport {
    pub fn new(title: &str, events: Vec<Event>) -> Self {
        Self {
            title: title.to_string(),
            events,
            generated_at: Utc::now(),
        }
    }
}

impl ReportData for AuditTrailReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        ["ID", "Timestamp", "Type", "Actor", "Entity", "Loan", "Amount", "Balance", "Description"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.events
            .iter()
            .map(|e| {
                vec![
                    e.event_id.clone(),
                    e.timestamp.to_rfc3339(),
                    e.event_type.as_str().to_string(),
                    e.actor_id.clone(),
                    e.entity_id.clone(),
                    e.loan_code.clone().unwrap_or_default(),
                    opt_decimal(e.amount),
                    opt_decimal(e.balance_after),
                    e.description.clone().unwrap_or_default(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        let amount: Decimal = self.events.iter().filter_map(|e| e.amount).sum();
        vec![
            kv("Events", self.events.len()),
            kv("Amount", amount),
            kv("Generated At", self.generated_at.to_rfc3339()),
        ]
    }

    fn numeric_columns(&self) -> Vec<usize> {
        vec![6, 7]
    }
}
