//! Reporting queries - dashboard, daily collections, statistics
//!
//! All figures are computed in Rust from exact decimals; nothing is summed
//! in SQL.

use crate::error::BusinessResult;
use crate::loans::{LoanOverview, LoanService};
use crate::payments::{PaymentService, PaymentTotals, PaymentView};
use crate::services::ServiceContext;
use chrono::{Duration, NaiveDate};
use lendbook_core::{LoanStanding, LoanStatus, PaymentMethod};
use lendbook_persistence::{ClientRepo, LoanQuery, LoanRepo, PaymentQuery, PaymentRepo};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Number of recent loans shown on the dashboard
const DASHBOARD_RECENT: usize = 5;
/// Number of top debtors shown on the dashboard
const DASHBOARD_TOP_DEBTORS: usize = 5;
/// Length of the payment series in the statistics
const SERIES_DAYS: i64 = 7;

/// Collections of one payment method
#[derive(Debug, Clone, Serialize)]
pub struct MethodBreakdown {
    pub method: PaymentMethod,
    pub count: usize,
    pub total: Decimal,
}

/// Daily collection report
#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub totals: PaymentTotals,
    pub by_method: Vec<MethodBreakdown>,
    pub payments: Vec<PaymentView>,
}

/// Collections of one day
#[derive(Debug, Clone, Serialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub count: usize,
    pub total: Decimal,
}

/// Payment statistics over a range plus today's figures and a 7-day series
#[derive(Debug, Clone, Serialize)]
pub struct PaymentStats {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub totals: PaymentTotals,
    pub today: DayTotal,
    pub last_days: Vec<DayTotal>,
}

/// Loans with a given standing
#[derive(Debug, Clone, Serialize)]
pub struct StandingCount {
    pub standing: LoanStanding,
    pub count: usize,
    pub balance: Decimal,
}

/// Outstanding debt of one client over their active loans
#[derive(Debug, Clone, Serialize)]
pub struct ClientDebt {
    pub client_id: i64,
    pub client_name: String,
    pub national_id: String,
    pub active_loans: usize,
    pub outstanding: Decimal,
}

/// Dashboard figures, optionally restricted to one lender
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub today: NaiveDate,
    pub lender_code: Option<String>,
    pub total_loans: usize,
    pub by_standing: Vec<StandingCount>,
    pub total_outstanding: Decimal,
    pub active_clients: i64,
    pub recent_loans: Vec<LoanOverview>,
    pub due_soon: Vec<LoanOverview>,
    pub delinquent: Vec<LoanOverview>,
    pub top_debtors: Vec<ClientDebt>,
    pub today_payments: PaymentTotals,
}

/// Loans of a standing inside a loans report
#[derive(Debug, Clone, Serialize)]
pub struct StandingGroup {
    pub standing: LoanStanding,
    pub count: usize,
    pub lent: Decimal,
    pub outstanding: Decimal,
    pub loans: Vec<LoanOverview>,
}

/// Loans started in a date range, grouped by standing
#[derive(Debug, Clone, Serialize)]
pub struct LoansReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub lender_code: Option<String>,
    pub total_count: usize,
    pub total_lent: Decimal,
    pub total_outstanding: Decimal,
    pub groups: Vec<StandingGroup>,
}

fn count_by_standing(items: &[LoanOverview]) -> Vec<StandingCount> {
    LoanStanding::all()
        .into_iter()
        .map(|standing| {
            let matching = items.iter().filter(|i| i.standing == standing);
            let (count, balance) = matching.fold((0, Decimal::ZERO), |(c, b), i| {
                (c + 1, b + i.loan.balance)
            });
            StandingCount {
                standing,
                count,
                balance,
            }
        })
        .collect()
}

/// Report Service - read-only statistics over the ledger
pub struct ReportService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReportService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Collections of `date`: totals, breakdown by method and the payments
    pub async fn daily_report(&self, date: NaiveDate) -> BusinessResult<DailyReport> {
        let payments = PaymentRepo::list(self.ctx.pool(), &PaymentQuery::new().on(date)).await?;
        let totals = PaymentTotals::over(&payments);

        let by_method = PaymentMethod::all()
            .into_iter()
            .filter_map(|method| {
                let of_method: Vec<_> = payments.iter().filter(|p| p.method == method).collect();
                if of_method.is_empty() {
                    return None;
                }
                Some(MethodBreakdown {
                    method,
                    count: of_method.len(),
                    total: of_method.iter().map(|p| p.total).sum(),
                })
            })
            .collect();

        Ok(DailyReport {
            date,
            totals,
            by_method,
            payments: PaymentService::new(self.ctx).views(payments).await?,
        })
    }

    /// Totals over `[from, to]` (open ends allowed), today's collections and
    /// the last seven days ending today
    pub async fn payment_stats(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> BusinessResult<PaymentStats> {
        let pool = self.ctx.pool();

        let range = PaymentQuery {
            from,
            to,
            ..PaymentQuery::default()
        };
        let totals = PaymentTotals::over(&PaymentRepo::list(pool, &range).await?);

        let series_start = today - Duration::days(SERIES_DAYS - 1);
        let recent = PaymentRepo::list(pool, &PaymentQuery::new().between(series_start, today)).await?;

        let last_days: Vec<DayTotal> = series_start
            .iter_days()
            .take(SERIES_DAYS as usize)
            .map(|date| {
                let day = PaymentTotals::over(recent.iter().filter(|p| p.date == date));
                DayTotal {
                    date,
                    count: day.count,
                    total: day.total,
                }
            })
            .collect();

        let today_total = last_days
            .last()
            .cloned()
            .unwrap_or(DayTotal {
                date: today,
                count: 0,
                total: Decimal::ZERO,
            });

        Ok(PaymentStats {
            from,
            to,
            totals,
            today: today_total,
            last_days,
        })
    }

    /// Portfolio overview, optionally for a single lender
    pub async fn dashboard(&self, lender_code: Option<&str>, today: NaiveDate) -> BusinessResult<Dashboard> {
        let pool = self.ctx.pool();
        let settings = self.ctx.settings();

        let mut query = LoanQuery::new();
        if let Some(code) = lender_code {
            query = query.lender(code);
        }
        let loans = LoanRepo::list(pool, &query).await?;
        let loan_ids: HashSet<i64> = loans.iter().map(|l| l.id).collect();
        let items = LoanService::new(self.ctx).overview(loans, today).await?;

        let total_outstanding = items
            .iter()
            .filter(|i| i.standing.is_outstanding())
            .map(|i| i.loan.balance)
            .sum();

        let mut due_soon: Vec<LoanOverview> = items
            .iter()
            .filter(|i| i.loan.is_due_within(today, settings.due_soon_days))
            .cloned()
            .collect();
        due_soon.sort_by(|a, b| a.loan.due_date.cmp(&b.loan.due_date));

        let mut delinquent: Vec<LoanOverview> = items
            .iter()
            .filter(|i| i.standing == LoanStanding::Delinquent)
            .cloned()
            .collect();
        delinquent.sort_by(|a, b| b.days_overdue.cmp(&a.days_overdue));

        let today_payments = PaymentRepo::list(pool, &PaymentQuery::new().on(today)).await?;
        let today_payments = PaymentTotals::over(
            today_payments
                .iter()
                .filter(|p| lender_code.is_none() || loan_ids.contains(&p.loan_id)),
        );

        Ok(Dashboard {
            today,
            lender_code: lender_code.map(str::to_string),
            total_loans: items.len(),
            by_standing: count_by_standing(&items),
            total_outstanding,
            active_clients: ClientRepo::count_active(pool).await?,
            recent_loans: items.iter().take(DASHBOARD_RECENT).cloned().collect(),
            due_soon,
            delinquent,
            top_debtors: self.rank_debtors(&items, DASHBOARD_TOP_DEBTORS).await?,
            today_payments,
        })
    }

    /// Loans started in `[from, to]`, grouped by their standing on `today`
    pub async fn loans_report(
        &self,
        lender_code: Option<&str>,
        from: NaiveDate,
        to: NaiveDate,
        today: NaiveDate,
    ) -> BusinessResult<LoansReport> {
        let mut query = LoanQuery::new().started_between(from, to);
        if let Some(code) = lender_code {
            query = query.lender(code);
        }
        let loans = LoanRepo::list(self.ctx.pool(), &query).await?;
        let items = LoanService::new(self.ctx).overview(loans, today).await?;

        let groups: Vec<StandingGroup> = LoanStanding::all()
            .into_iter()
            .filter_map(|standing| {
                let loans: Vec<LoanOverview> =
                    items.iter().filter(|i| i.standing == standing).cloned().collect();
                if loans.is_empty() {
                    return None;
                }
                Some(StandingGroup {
                    standing,
                    count: loans.len(),
                    lent: loans.iter().map(|i| i.loan.initial_amount).sum(),
                    outstanding: loans
                        .iter()
                        .filter(|i| i.standing.is_outstanding())
                        .map(|i| i.loan.balance)
                        .sum(),
                    loans,
                })
            })
            .collect();

        Ok(LoansReport {
            from,
            to,
            lender_code: lender_code.map(str::to_string),
            total_count: items.len(),
            total_lent: items.iter().map(|i| i.loan.initial_amount).sum(),
            total_outstanding: groups.iter().map(|g| g.outstanding).sum(),
            groups,
        })
    }

    /// Clients ordered by outstanding balance over their active loans
    pub async fn client_debt_ranking(&self, limit: usize) -> BusinessResult<Vec<ClientDebt>> {
        let loans = LoanRepo::list(self.ctx.pool(), &LoanQuery::new().status(LoanStatus::Active)).await?;
        let mut totals: HashMap<i64, (usize, Decimal)> = HashMap::new();
        for loan in &loans {
            let entry = totals.entry(loan.client_id).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += loan.balance;
        }
        self.ranked(totals, limit).await
    }

    async fn rank_debtors(&self, items: &[LoanOverview], limit: usize) -> BusinessResult<Vec<ClientDebt>> {
        let mut totals: HashMap<i64, (usize, Decimal)> = HashMap::new();
        for item in items.iter().filter(|i| i.standing.is_outstanding()) {
            let entry = totals.entry(item.loan.client_id).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += item.loan.balance;
        }
        self.ranked(totals, limit).await
    }

    async fn ranked(
        &self,
        totals: HashMap<i64, (usize, Decimal)>,
        limit: usize,
    ) -> BusinessResult<Vec<ClientDebt>> {
        let mut ranking: Vec<(i64, usize, Decimal)> = totals
            .into_iter()
            .map(|(client_id, (count, outstanding))| (client_id, count, outstanding))
            .collect();
        ranking.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)));
        ranking.truncate(limit);

        let mut debts = Vec::with_capacity(ranking.len());
        for (client_id, active_loans, outstanding) in ranking {
            let client = ClientRepo::get_by_id(self.ctx.pool(), client_id).await?;
            debts.push(ClientDebt {
                client_id,
                client_name: client.full_name(),
                national_id: client.national_id,
                active_loans,
                outstanding,
            });
        }
        Ok(debts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lendbook_core::{InterestTiming, Loan, NewLoan};
    use rust_decimal_macros::dec;

    fn item(code: &str, standing: LoanStanding, balance: Decimal) -> LoanOverview {
        let new = NewLoan {
            client_id: 1,
            lender_code: "PRE001".to_string(),
            codebtor_id: None,
            initial_amount: dec!(100000),
            rate_percent: Some(dec!(5)),
            interest_timing: InterestTiming::Due,
            start_date: Utc::now().date_naive(),
            due_date: None,
            term_months: None,
            note_photo: None,
            note_photo_back: None,
            notes: String::new(),
        };
        let mut loan = Loan::open(1, code.to_string(), &new, dec!(5));
        loan.balance = balance;
        LoanOverview {
            loan,
            client_name: "Ana Gomez".to_string(),
            standing,
            days_overdue: 0,
            interest_due: Decimal::ZERO,
        }
    }

    #[test]
    fn test_count_by_standing_lists_every_standing() {
        let items = vec![
            item("PR000001", LoanStanding::Active, dec!(60000)),
            item("PR000002", LoanStanding::Overdue, dec!(40000)),
            item("PR000003", LoanStanding::Active, dec!(10000)),
        ];
        let counts = count_by_standing(&items);

        assert_eq!(counts.len(), 5);
        assert_eq!(counts[0].standing, LoanStanding::Active);
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[0].balance, dec!(70000));
        assert_eq!(counts[2].standing, LoanStanding::Overdue);
        assert_eq!(counts[2].count, 1);
        assert_eq!(counts[4].count, 0);
    }
}
