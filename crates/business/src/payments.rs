//! Payment operations - record, void, query
//!
//! PaymentService applies payments to a loan's balance. The receipt number,
//! the balance update and the payment row are committed together.

use crate::error::{BusinessError, BusinessResult};
use crate::services::{Directory, ServiceContext};
use chrono::Utc;
use lendbook_core::{
    allocate, Event, EventType, Loan, LoanStatus, NewPayment, Payment, SequenceKind, Tender,
};
use lendbook_persistence::{LoanRepo, PaymentQuery, PaymentRepo, SequenceRepo};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

/// A payment with the loan code and client name it belongs to
#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    pub payment: Payment,
    pub loan_code: String,
    pub client_name: String,
}

/// Sums over non-voided payments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PaymentTotals {
    pub count: usize,
    pub total: Decimal,
    pub interest: Decimal,
    pub principal: Decimal,
}

impl PaymentTotals {
    /// Voided payments are skipped
    pub fn add(&mut self, payment: &Payment) {
        if payment.voided {
            return;
        }
        self.count += 1;
        self.total += payment.total;
        self.interest += payment.interest;
        self.principal += payment.principal;
    }

    pub fn over<'p, I>(payments: I) -> Self
    where
        I: IntoIterator<Item = &'p Payment>,
    {
        let mut totals = Self::default();
        for payment in payments {
            totals.add(payment);
        }
        totals
    }
}

/// Result of a filtered payment listing
#[derive(Debug, Clone, Serialize)]
pub struct PaymentList {
    pub items: Vec<PaymentView>,
    pub totals: PaymentTotals,
}

/// Payment Service - handles recording and voiding payments
pub struct PaymentService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PaymentService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Record a payment against an active loan.
    ///
    /// Without an explicit split, interest is covered first up to the
    /// month's interest on the current balance and the rest goes to principal.
    pub async fn record_payment(&self, actor_id: &str, new: NewPayment) -> BusinessResult<Payment> {
        let pool = self.ctx.pool();
        let sequence = self.ctx.settings().sequence(SequenceKind::Receipt);
        let (new, sequence) = (&new, &sequence);

        let (payment, loan) = self
            .ctx
            .with_retry("record_payment", move || async move {
                let mut tx = pool.begin().await?;
                // Receipt first: the sequence write holds the lock for the rest
                let receipt = SequenceRepo::issue(&mut tx, sequence).await?;

                let mut loan = LoanRepo::get_by_code(&mut *tx, &new.loan_code).await?;
                loan.ensure_open()?;

                let tender = Tender {
                    total: new.total,
                    interest: new.interest,
                    principal: new.principal,
                };
                let allocation = allocate(tender, loan.monthly_interest(), loan.balance)?;
                loan.apply_principal(allocation.principal, Utc::now())?;
                LoanRepo::update_state(&mut *tx, &loan).await?;

                let mut payment = Payment::record(0, receipt, loan.id, &allocation, new, actor_id);
                payment.id = PaymentRepo::insert(&mut *tx, &payment).await?;
                tx.commit().await?;
                Ok::<_, BusinessError>((payment, loan))
            })
            .await?;

        info!(
            receipt = %payment.receipt,
            loan = %loan.code,
            total = %payment.total,
            interest = %payment.interest,
            principal = %payment.principal,
            balance = %loan.balance,
            "Payment recorded"
        );
        self.ctx.record_event(|id| {
            Event::payment_recorded(
                id,
                actor_id,
                &payment.receipt,
                &loan.code,
                payment.total,
                payment.interest,
                payment.principal,
                loan.balance,
            )
        })?;
        if loan.status == LoanStatus::Paid {
            info!(loan = %loan.code, "Loan paid off");
            self.ctx.record_event(|id| {
                Event::new(id.to_string(), EventType::LoanPaidOff, actor_id, &loan.code)
                    .with_loan(&loan.code)
                    .with_balance(loan.balance)
            })?;
        }

        Ok(payment)
    }

    /// Void a payment and give its principal back to the loan.
    ///
    /// Returns `false` without changing anything when the payment was
    /// already voided.
    pub async fn void_payment(
        &self,
        actor_id: &str,
        receipt: &str,
        reason: &str,
    ) -> BusinessResult<bool> {
        let pool = self.ctx.pool();

        let voided = self
            .ctx
            .with_retry("void_payment", move || async move {
                let mut tx = pool.begin().await?;
                let mut payment = PaymentRepo::get_by_receipt(&mut *tx, receipt).await?;
                if !payment.void(reason, actor_id, Utc::now())? {
                    return Ok::<Option<(Payment, Loan)>, BusinessError>(None);
                }

                let mut loan = LoanRepo::get_by_id(&mut *tx, payment.loan_id).await?;
                loan.restore_principal(payment.principal, Utc::now())?;
                LoanRepo::update_state(&mut *tx, &loan).await?;
                PaymentRepo::update_void(&mut *tx, &payment).await?;
                tx.commit().await?;
                Ok(Some((payment, loan)))
            })
            .await?;

        let Some((payment, loan)) = voided else {
            info!(receipt, "Payment already voided");
            return Ok(false);
        };

        info!(
            receipt = %payment.receipt,
            loan = %loan.code,
            restored = %payment.principal,
            balance = %loan.balance,
            "Payment voided"
        );
        self.ctx.record_event(|id| {
            Event::payment_voided(
                id,
                actor_id,
                &payment.receipt,
                &loan.code,
                payment.principal,
                loan.balance,
                &payment.void_reason,
            )
        })?;

        Ok(true)
    }

    /// Payment with its loan code and client name
    pub async fn get_payment(&self, receipt: &str) -> BusinessResult<PaymentView> {
        let payment = PaymentRepo::get_by_receipt(self.ctx.pool(), receipt).await?;
        let mut views = self.views(vec![payment]).await?;
        views
            .pop()
            .ok_or_else(|| BusinessError::not_found("Payment", receipt))
    }

    /// Payments matching `query`, newest first, with totals over the
    /// non-voided ones
    pub async fn list_payments(&self, query: &PaymentQuery) -> BusinessResult<PaymentList> {
        let payments = PaymentRepo::list(self.ctx.pool(), query).await?;
        let totals = PaymentTotals::over(&payments);
        Ok(PaymentList {
            items: self.views(payments).await?,
            totals,
        })
    }

    pub async fn mark_receipt_printed(&self, actor_id: &str, receipt: &str) -> BusinessResult<Payment> {
        let pool = self.ctx.pool();
        PaymentRepo::set_receipt_printed(pool, receipt).await?;
        let payment = PaymentRepo::get_by_receipt(pool, receipt).await?;

        self.ctx.record_event(|id| {
            Event::new(id.to_string(), EventType::ReceiptPrinted, actor_id, receipt)
        })?;
        Ok(payment)
    }

    pub(crate) async fn views(&self, payments: Vec<Payment>) -> BusinessResult<Vec<PaymentView>> {
        let pool = self.ctx.pool();
        let mut directory = Directory::default();
        let mut views = Vec::with_capacity(payments.len());

        for payment in payments {
            let loan = directory.loan(pool, payment.loan_id).await?;
            let (loan_code, client_id) = (loan.code.clone(), loan.client_id);
            let client_name = directory.client(pool, client_id).await?.full_name();
            views.push(PaymentView {
                payment,
                loan_code,
                client_name,
            });
        }
        Ok(views)
    }
}
