//! Loan operations - create, cancel, query, simulate
//!
//! LoanService opens loans against a client and a lender, derives their
//! standing for a given day and answers the overdue / due-soon queries.

use crate::error::{BusinessError, BusinessResult};
use crate::payments::PaymentTotals;
use crate::services::{Directory, ServiceContext};
use chrono::{NaiveDate, Utc};
use lendbook_core::{
    simulate, Client, CoDebtor, Event, EventType, Lender, Loan, LoanDetails, LoanStanding,
    LoanStatus, NewLoan, Payment, Schedule, SequenceKind,
};
use lendbook_persistence::{
    ClientRepo, CoDebtorRepo, LenderRepo, LoanQuery, LoanRepo, PaymentRepo, SequenceRepo,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

/// Loan list filter. `standing` is evaluated against the `today` passed to
/// [`LoanService::list_loans`].
#[derive(Debug, Clone, Default)]
pub struct LoanFilter {
    /// Loan code, client name or national id
    pub search: Option<String>,
    pub lender_code: Option<String>,
    pub client_id: Option<i64>,
    pub standing: Option<LoanStanding>,
    pub started_from: Option<NaiveDate>,
    pub started_to: Option<NaiveDate>,
    pub limit: Option<u32>,
}

impl LoanFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: &str) -> Self {
        self.search = Some(term.to_string());
        self
    }

    pub fn lender(mut self, code: &str) -> Self {
        self.lender_code = Some(code.to_string());
        self
    }

    pub fn client(mut self, client_id: i64) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn standing(mut self, standing: LoanStanding) -> Self {
        self.standing = Some(standing);
        self
    }

    pub fn started_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.started_from = Some(from);
        self.started_to = Some(to);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Persisted status that every loan with the requested standing has
    fn status(&self) -> Option<LoanStatus> {
        self.standing.map(|standing| match standing {
            LoanStanding::Paid => LoanStatus::Paid,
            LoanStanding::Cancelled => LoanStatus::Cancelled,
            _ => LoanStatus::Active,
        })
    }

    fn to_query(&self) -> LoanQuery {
        let mut query = LoanQuery {
            search: self.search.clone(),
            lender_code: self.lender_code.clone(),
            client_id: self.client_id,
            status: self.status(),
            started_from: self.started_from,
            started_to: self.started_to,
            limit: None,
        };
        // Active / overdue / delinquent share a status, so limit after filtering
        if matches!(
            self.standing,
            None | Some(LoanStanding::Paid) | Some(LoanStanding::Cancelled)
        ) {
            query.limit = self.limit;
        }
        query
    }
}

/// A loan as shown in lists: with client name and the standing of the day
#[derive(Debug, Clone, Serialize)]
pub struct LoanOverview {
    pub loan: Loan,
    pub client_name: String,
    pub standing: LoanStanding,
    pub days_overdue: i64,
    /// Current month's interest on the balance
    pub interest_due: Decimal,
}

/// Loan detail with its parties and payment totals
#[derive(Debug, Clone, Serialize)]
pub struct LoanSummary {
    pub loan: Loan,
    pub client: Client,
    pub lender: Lender,
    pub codebtor: Option<CoDebtor>,
    pub standing: LoanStanding,
    pub days_overdue: i64,
    pub interest_due: Decimal,
    /// All payments, voided ones included, oldest first
    pub payments: Vec<Payment>,
    /// Totals over non-voided payments
    pub payment_count: usize,
    pub total_paid: Decimal,
    pub interest_paid: Decimal,
    pub principal_paid: Decimal,
}

/// Loan Service - handles loan lifecycle and loan queries
pub struct LoanService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> LoanService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Open a loan. The balance starts at the initial amount and the
    /// `PR######` code is issued in the same transaction as the insert.
    pub async fn create_loan(&self, actor_id: &str, new: NewLoan) -> BusinessResult<Loan> {
        let settings = self.ctx.settings();
        new.validate(settings.minimum_loan_amount)?;

        let pool = self.ctx.pool();
        let lender = LenderRepo::get_by_code(pool, &new.lender_code).await?;
        if !lender.active {
            return Err(BusinessError::validation(format!(
                "Lender {} is not active",
                lender.code
            )));
        }

        let client = ClientRepo::get_by_id(pool, new.client_id).await?;
        if !client.active {
            return Err(BusinessError::validation(format!(
                "Client {} is not active",
                client.id
            )));
        }

        if let Some(codebtor_id) = new.codebtor_id {
            let codebtor = CoDebtorRepo::get_by_id(pool, codebtor_id).await?;
            if codebtor.client_id != client.id {
                return Err(BusinessError::validation(format!(
                    "Co-debtor {} does not belong to client {}",
                    codebtor_id, client.id
                )));
            }
        }

        let rate = new.rate_percent.unwrap_or(lender.default_rate);
        let new = &new;

        let loan = self
            .ctx
            .with_retry("create_loan", move || async move {
                let mut tx = pool.begin().await?;
                let code = SequenceRepo::issue(&mut tx, &settings.sequence(SequenceKind::Loan)).await?;

                let mut loan = Loan::open(0, code, new, rate);
                loan.id = LoanRepo::insert(&mut *tx, &loan).await?;
                tx.commit().await?;
                Ok::<_, BusinessError>(loan)
            })
            .await?;

        info!(
            code = %loan.code,
            client_id = loan.client_id,
            amount = %loan.initial_amount,
            "Loan created"
        );
        self.ctx.record_event(|id| {
            Event::loan_created(id, actor_id, &loan.code, loan.initial_amount)
                .with_description(&format!("{} at {}%", client.full_name(), loan.rate_percent))
        })?;

        Ok(loan)
    }

    pub async fn get_loan(&self, code: &str) -> BusinessResult<Loan> {
        Ok(LoanRepo::get_by_code(self.ctx.pool(), code).await?)
    }

    /// Loans matching `filter`, newest start date first
    pub async fn list_loans(
        &self,
        filter: &LoanFilter,
        today: NaiveDate,
    ) -> BusinessResult<Vec<LoanOverview>> {
        let loans = LoanRepo::list(self.ctx.pool(), &filter.to_query()).await?;
        let mut items = self.overview(loans, today).await?;

        if let Some(standing) = filter.standing {
            items.retain(|item| item.standing == standing);
        }
        if let Some(limit) = filter.limit {
            items.truncate(limit as usize);
        }
        Ok(items)
    }

    /// Edit a loan's co-debtor, dates, note photos and notes. Amounts,
    /// rate and balance are left as they are.
    pub async fn update_loan(
        &self,
        actor_id: &str,
        code: &str,
        details: LoanDetails,
    ) -> BusinessResult<Loan> {
        let pool = self.ctx.pool();
        let details = &details;

        let loan = self
            .ctx
            .with_retry("update_loan", move || async move {
                let mut tx = pool.begin().await?;
                let mut loan = LoanRepo::get_by_code(&mut *tx, code).await?;

                if let Some(codebtor_id) = details.codebtor_id {
                    let codebtor = CoDebtorRepo::get_by_id(&mut *tx, codebtor_id).await?;
                    if codebtor.client_id != loan.client_id {
                        return Err(BusinessError::validation(format!(
                            "Co-debtor {} does not belong to client {}",
                            codebtor_id, loan.client_id
                        )));
                    }
                }

                loan.apply_details(details.clone(), Utc::now())?;
                LoanRepo::update_details(&mut *tx, &loan).await?;
                tx.commit().await?;
                Ok::<_, BusinessError>(loan)
            })
            .await?;

        info!(code = %loan.code, "Loan updated");
        self.ctx.record_event(|id| {
            Event::new(id.to_string(), EventType::LoanUpdated, actor_id, &loan.code)
                .with_loan(&loan.code)
                .with_balance(loan.balance)
        })?;

        Ok(loan)
    }

    /// Cancel an active loan. Paid or already cancelled loans are rejected.
    pub async fn cancel_loan(&self, actor_id: &str, code: &str, reason: &str) -> BusinessResult<Loan> {
        let pool = self.ctx.pool();

        let loan = self
            .ctx
            .with_retry("cancel_loan", move || async move {
                let mut tx = pool.begin().await?;
                let mut loan = LoanRepo::get_by_code(&mut *tx, code).await?;
                loan.cancel(reason, Utc::now())?;
                LoanRepo::update_state(&mut *tx, &loan).await?;
                tx.commit().await?;
                Ok::<_, BusinessError>(loan)
            })
            .await?;

        info!(code = %loan.code, "Loan cancelled");
        self.ctx.record_event(|id| {
            Event::new(id.to_string(), EventType::LoanCancelled, actor_id, &loan.code)
                .with_loan(&loan.code)
                .with_balance(loan.balance)
                .with_description(loan.cancel_reason.as_deref().unwrap_or_default())
        })?;

        Ok(loan)
    }

    /// Loan with client, lender, co-debtor, payments and totals
    pub async fn loan_summary(&self, code: &str, today: NaiveDate) -> BusinessResult<LoanSummary> {
        let pool = self.ctx.pool();
        let loan = LoanRepo::get_by_code(pool, code).await?;
        let client = ClientRepo::get_by_id(pool, loan.client_id).await?;
        let lender = LenderRepo::get_by_code(pool, &loan.lender_code).await?;
        let codebtor = match loan.codebtor_id {
            Some(id) => Some(CoDebtorRepo::get_by_id(pool, id).await?),
            None => None,
        };
        let payments = PaymentRepo::list_for_loan(pool, loan.id).await?;

        let totals = PaymentTotals::over(&payments);

        Ok(LoanSummary {
            standing: loan.standing(today, self.ctx.settings().delinquency_days),
            days_overdue: loan.days_overdue(today),
            interest_due: loan.monthly_interest(),
            loan,
            client,
            lender,
            codebtor,
            payments,
            payment_count: totals.count,
            total_paid: totals.total,
            interest_paid: totals.interest,
            principal_paid: totals.principal,
        })
    }

    /// Active loans past their due date, most overdue first
    pub async fn overdue_loans(&self, today: NaiveDate) -> BusinessResult<Vec<LoanOverview>> {
        let loans = LoanRepo::list(self.ctx.pool(), &LoanQuery::new().status(LoanStatus::Active))
            .await?
            .into_iter()
            .filter(|loan| loan.days_overdue(today) > 0)
            .collect();

        let mut items = self.overview(loans, today).await?;
        items.sort_by(|a, b| {
            b.days_overdue
                .cmp(&a.days_overdue)
                .then_with(|| a.loan.code.cmp(&b.loan.code))
        });
        Ok(items)
    }

    /// Active loans falling due within `days` days of `today`, soonest first
    pub async fn loans_due_soon(
        &self,
        today: NaiveDate,
        days: i64,
    ) -> BusinessResult<Vec<LoanOverview>> {
        let loans = LoanRepo::list(self.ctx.pool(), &LoanQuery::new().status(LoanStatus::Active))
            .await?
            .into_iter()
            .filter(|loan| loan.is_due_within(today, days))
            .collect();

        let mut items = self.overview(loans, today).await?;
        items.sort_by(|a, b| {
            a.loan
                .due_date
                .cmp(&b.loan.due_date)
                .then_with(|| a.loan.code.cmp(&b.loan.code))
        });
        Ok(items)
    }

    /// Projected declining-balance schedule for a hypothetical loan
    pub fn simulate_loan(
        &self,
        principal: Decimal,
        rate_percent: Decimal,
        term_months: u32,
    ) -> BusinessResult<Schedule> {
        Ok(simulate(principal, rate_percent, term_months)?)
    }

    pub(crate) async fn overview(
        &self,
        loans: Vec<Loan>,
        today: NaiveDate,
    ) -> BusinessResult<Vec<LoanOverview>> {
        let pool = self.ctx.pool();
        let delinquency_days = self.ctx.settings().delinquency_days;
        let mut directory = Directory::default();
        let mut items = Vec::with_capacity(loans.len());

        for loan in loans {
            let client_name = directory.client(pool, loan.client_id).await?.full_name();
            items.push(LoanOverview {
                client_name,
                standing: loan.standing(today, delinquency_days),
                days_overdue: loan.days_overdue(today),
                interest_due: loan.monthly_interest(),
                loan,
            });
        }
        Ok(items)
    }
}
