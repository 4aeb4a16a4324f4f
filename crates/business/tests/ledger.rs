//! End-to-end ledger scenarios against an in-memory database

use chrono::NaiveDate;
use lendbook_business::{
    LoanFilter, LoanService, PaymentQuery, PaymentService, RegistryService, ReportService,
    ServiceContext,
};
use lendbook_core::{
    ClientDetails, ErrorKind, EventType, InterestTiming, LedgerSettings, LoanStanding, LoanStatus,
    NewCoDebtor, NewLender, NewLoan, NewPayment, PaymentKind, PaymentMethod,
};
use lendbook_persistence::{Database, EventFilter};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

const ACTOR: &str = "cashier";

struct Ledger {
    _events_dir: TempDir,
    db: Database,
    ctx: ServiceContext,
}

async fn ledger() -> Ledger {
    let events_dir = tempfile::tempdir().unwrap();
    let db = Database::in_memory(events_dir.path()).await.unwrap();
    let ctx = ServiceContext::new(&db, LedgerSettings::default());
    Ledger {
        _events_dir: events_dir,
        db,
        ctx,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn client_details(national_id: &str, first: &str, last: &str) -> ClientDetails {
    ClientDetails {
        first_name: first.to_string(),
        last_name: last.to_string(),
        national_id: national_id.to_string(),
        primary_address: "Calle 10 # 20-30".to_string(),
        phone: "3001234567".to_string(),
        ..Default::default()
    }
}

/// Lender PRE001 at 4% and one client
async fn seed(ctx: &ServiceContext) -> (String, i64) {
    let registry = RegistryService::new(ctx);
    let lender = registry
        .create_lender(
            ACTOR,
            NewLender {
                first_name: "Carlos".to_string(),
                last_name: "Ruiz".to_string(),
                national_id: "80000001".to_string(),
                default_rate: dec!(4),
            },
        )
        .await
        .unwrap();
    let client = registry
        .create_client(ACTOR, client_details("1020304050", "Ana", "Gomez"))
        .await
        .unwrap();
    (lender.code, client.id)
}

fn new_loan(lender: &str, client_id: i64, amount: Decimal) -> NewLoan {
    NewLoan {
        client_id,
        lender_code: lender.to_string(),
        codebtor_id: None,
        initial_amount: amount,
        rate_percent: None,
        interest_timing: InterestTiming::Due,
        start_date: date(2026, 1, 1),
        due_date: None,
        term_months: Some(12),
        note_photo: None,
        note_photo_back: None,
        notes: String::new(),
    }
}

fn payment(loan_code: &str, total: Decimal, on: NaiveDate) -> NewPayment {
    NewPayment {
        loan_code: loan_code.to_string(),
        total,
        interest: None,
        principal: None,
        method: PaymentMethod::Cash,
        date: on,
        reference: String::new(),
        notes: String::new(),
        receipt_scan: None,
    }
}

fn split(loan_code: &str, total: Decimal, interest: Decimal, principal: Decimal) -> NewPayment {
    NewPayment {
        interest: Some(interest),
        principal: Some(principal),
        ..payment(loan_code, total, date(2026, 2, 1))
    }
}

#[tokio::test]
async fn test_codes_are_sequential() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    assert_eq!(lender, "PRE001");

    let loans = LoanService::new(&ledger.ctx);
    let first = loans.create_loan(ACTOR, new_loan(&lender, client_id, dec!(500000))).await.unwrap();
    let second = loans.create_loan(ACTOR, new_loan(&lender, client_id, dec!(300000))).await.unwrap();
    assert_eq!(first.code, "PR000001");
    assert_eq!(second.code, "PR000002");

    let payments = PaymentService::new(&ledger.ctx);
    let p1 = payments.record_payment(ACTOR, payment("PR000001", dec!(50000), date(2026, 2, 1))).await.unwrap();
    let p2 = payments.record_payment(ACTOR, payment("PR000002", dec!(50000), date(2026, 2, 1))).await.unwrap();
    assert_eq!(p1.receipt, "REC00000001");
    assert_eq!(p2.receipt, "REC00000002");
}

#[tokio::test]
async fn test_loan_defaults() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    let loans = LoanService::new(&ledger.ctx);

    let loan = loans.create_loan(ACTOR, new_loan(&lender, client_id, dec!(1200000))).await.unwrap();
    assert_eq!(loan.balance, dec!(1200000));
    assert_eq!(loan.rate_percent, dec!(4));
    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(loan.due_date, Some(date(2027, 1, 1)));

    let stored = loans.get_loan(&loan.code).await.unwrap();
    assert_eq!(stored.balance, dec!(1200000));
    assert_eq!(stored.due_date, loan.due_date);
}

#[tokio::test]
async fn test_loan_below_minimum_is_rejected() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;

    let err = LoanService::new(&ledger.ctx)
        .create_loan(ACTOR, new_loan(&lender, client_id, dec!(40000)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_loan_requires_known_parties() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    let loans = LoanService::new(&ledger.ctx);

    let err = loans
        .create_loan(ACTOR, new_loan("PRE999", client_id, dec!(100000)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = loans
        .create_loan(ACTOR, new_loan(&lender, 999, dec!(100000)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    RegistryService::new(&ledger.ctx)
        .deactivate_client(ACTOR, client_id)
        .await
        .unwrap();
    let err = loans
        .create_loan(ACTOR, new_loan(&lender, client_id, dec!(100000)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_codebtor_must_belong_to_client() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    let registry = RegistryService::new(&ledger.ctx);

    let other = registry
        .create_client(ACTOR, client_details("5566778899", "Luis", "Perez"))
        .await
        .unwrap();
    let codebtor = registry
        .add_codebtor(
            ACTOR,
            other.id,
            NewCoDebtor {
                full_name: "Marta Perez".to_string(),
                national_id: "99887766".to_string(),
                phone: "3100000000".to_string(),
                address: "Carrera 5".to_string(),
                relationship: "sister".to_string(),
            },
        )
        .await
        .unwrap();

    let loans = LoanService::new(&ledger.ctx);
    let mut request = new_loan(&lender, client_id, dec!(200000));
    request.codebtor_id = Some(codebtor.id);
    let err = loans.create_loan(ACTOR, request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut request = new_loan(&lender, other.id, dec!(200000));
    request.codebtor_id = Some(codebtor.id);
    let loan = loans.create_loan(ACTOR, request).await.unwrap();
    assert_eq!(loan.codebtor_id, Some(codebtor.id));
}

#[tokio::test]
async fn test_duplicate_national_id_is_rejected() {
    let ledger = ledger().await;
    seed(&ledger.ctx).await;

    let err = RegistryService::new(&ledger.ctx)
        .create_client(ACTOR, client_details("1020304050", "Otra", "Persona"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_auto_allocation_reduces_balance() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    let loan = LoanService::new(&ledger.ctx)
        .create_loan(ACTOR, new_loan(&lender, client_id, dec!(1200000)))
        .await
        .unwrap();

    let payments = PaymentService::new(&ledger.ctx);
    let first = payments
        .record_payment(ACTOR, payment(&loan.code, dec!(100000), date(2026, 2, 1)))
        .await
        .unwrap();
    assert_eq!(first.interest, dec!(48000));
    assert_eq!(first.principal, dec!(52000));
    assert_eq!(first.kind, PaymentKind::Mixed);

    let second = payments
        .record_payment(ACTOR, payment(&loan.code, dec!(100000), date(2026, 3, 1)))
        .await
        .unwrap();
    assert_eq!(second.interest, dec!(45920));
    assert_eq!(second.principal, dec!(54080));

    let loan = LoanService::new(&ledger.ctx).get_loan(&loan.code).await.unwrap();
    assert_eq!(loan.balance, dec!(1093920));
}

#[tokio::test]
async fn test_split_must_match_total() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    let loan = LoanService::new(&ledger.ctx)
        .create_loan(ACTOR, new_loan(&lender, client_id, dec!(1000000)))
        .await
        .unwrap();
    let payments = PaymentService::new(&ledger.ctx);

    let err = payments
        .record_payment(ACTOR, split(&loan.code, dec!(100000), dec!(40000), dec!(50000)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let recorded = payments
        .record_payment(ACTOR, split(&loan.code, dec!(100000), dec!(40000), dec!(60000)))
        .await
        .unwrap();
    assert_eq!(recorded.interest, dec!(40000));
    assert_eq!(recorded.principal, dec!(60000));

    let loan = LoanService::new(&ledger.ctx).get_loan(&loan.code).await.unwrap();
    assert_eq!(loan.balance, dec!(940000));
}

#[tokio::test]
async fn test_principal_over_balance_is_rejected() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    let loan = LoanService::new(&ledger.ctx)
        .create_loan(ACTOR, new_loan(&lender, client_id, dec!(100000)))
        .await
        .unwrap();

    let err = PaymentService::new(&ledger.ctx)
        .record_payment(ACTOR, split(&loan.code, dec!(150000), dec!(0), dec!(150000)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let loan = LoanService::new(&ledger.ctx).get_loan(&loan.code).await.unwrap();
    assert_eq!(loan.balance, dec!(100000));
}

#[tokio::test]
async fn test_payoff_then_void() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    let loans = LoanService::new(&ledger.ctx);
    let payments = PaymentService::new(&ledger.ctx);
    let loan = loans
        .create_loan(ACTOR, new_loan(&lender, client_id, dec!(100000)))
        .await
        .unwrap();

    let payoff = payments
        .record_payment(ACTOR, payment(&loan.code, dec!(104000), date(2026, 2, 1)))
        .await
        .unwrap();
    assert_eq!(payoff.interest, dec!(4000));
    assert_eq!(payoff.principal, dec!(100000));
    assert_eq!(payoff.kind, PaymentKind::Full);

    let paid = loans.get_loan(&loan.code).await.unwrap();
    assert_eq!(paid.status, LoanStatus::Paid);
    assert_eq!(paid.balance, Decimal::ZERO);
    assert!(paid.paid_at.is_some());

    let err = payments
        .record_payment(ACTOR, payment(&loan.code, dec!(10000), date(2026, 2, 2)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    assert!(payments.void_payment(ACTOR, &payoff.receipt, "wrong loan").await.unwrap());
    let reopened = loans.get_loan(&loan.code).await.unwrap();
    assert_eq!(reopened.status, LoanStatus::Active);
    assert_eq!(reopened.balance, dec!(100000));
    assert!(reopened.paid_at.is_none());

    assert!(!payments.void_payment(ACTOR, &payoff.receipt, "again").await.unwrap());
    let unchanged = loans.get_loan(&loan.code).await.unwrap();
    assert_eq!(unchanged.balance, dec!(100000));

    let view = payments.get_payment(&payoff.receipt).await.unwrap();
    assert!(view.payment.voided);
    assert_eq!(view.payment.void_reason, "wrong loan");
    assert_eq!(view.loan_code, loan.code);
    assert_eq!(view.client_name, "Ana Gomez");
}

#[tokio::test]
async fn test_cancel_rules() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    let loans = LoanService::new(&ledger.ctx);
    let payments = PaymentService::new(&ledger.ctx);

    let loan = loans
        .create_loan(ACTOR, new_loan(&lender, client_id, dec!(200000)))
        .await
        .unwrap();
    let recorded = payments
        .record_payment(ACTOR, payment(&loan.code, dec!(50000), date(2026, 2, 1)))
        .await
        .unwrap();

    let err = loans.cancel_loan(ACTOR, &loan.code, "  ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let cancelled = loans
        .cancel_loan(ACTOR, &loan.code, "entered twice")
        .await
        .unwrap();
    assert_eq!(cancelled.status, LoanStatus::Cancelled);
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("entered twice"));

    let err = loans.cancel_loan(ACTOR, &loan.code, "again").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    let err = payments
        .record_payment(ACTOR, payment(&loan.code, dec!(10000), date(2026, 2, 2)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    let err = payments
        .void_payment(ACTOR, &recorded.receipt, "mistake")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    let view = payments.get_payment(&recorded.receipt).await.unwrap();
    assert!(!view.payment.voided);

    let paid = loans
        .create_loan(ACTOR, new_loan(&lender, client_id, dec!(100000)))
        .await
        .unwrap();
    payments
        .record_payment(ACTOR, payment(&paid.code, dec!(104000), date(2026, 2, 1)))
        .await
        .unwrap();
    let err = loans.cancel_loan(ACTOR, &paid.code, "too late").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
}

#[tokio::test]
async fn test_overdue_and_due_soon() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    let loans = LoanService::new(&ledger.ctx);

    let mut short = new_loan(&lender, client_id, dec!(100000));
    short.term_months = Some(1);
    let short = loans.create_loan(ACTOR, short).await.unwrap();
    assert_eq!(short.due_date, Some(date(2026, 2, 1)));
    let long = loans
        .create_loan(ACTOR, new_loan(&lender, client_id, dec!(100000)))
        .await
        .unwrap();

    let due_soon = loans.loans_due_soon(date(2026, 1, 28), 7).await.unwrap();
    assert_eq!(due_soon.len(), 1);
    assert_eq!(due_soon[0].loan.code, short.code);

    let overdue = loans.overdue_loans(date(2026, 2, 11)).await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].days_overdue, 10);
    assert_eq!(overdue[0].standing, LoanStanding::Overdue);

    let overdue = loans.overdue_loans(date(2026, 3, 15)).await.unwrap();
    assert_eq!(overdue[0].standing, LoanStanding::Delinquent);

    let delinquent = loans
        .list_loans(&LoanFilter::new().standing(LoanStanding::Delinquent), date(2026, 3, 15))
        .await
        .unwrap();
    assert_eq!(delinquent.len(), 1);
    assert_eq!(delinquent[0].loan.code, short.code);

    let active = loans
        .list_loans(&LoanFilter::new().standing(LoanStanding::Active), date(2026, 3, 15))
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].loan.code, long.code);
}

#[tokio::test]
async fn test_loan_summary_totals() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    let loan = LoanService::new(&ledger.ctx)
        .create_loan(ACTOR, new_loan(&lender, client_id, dec!(1200000)))
        .await
        .unwrap();
    let payments = PaymentService::new(&ledger.ctx);
    payments
        .record_payment(ACTOR, payment(&loan.code, dec!(100000), date(2026, 2, 1)))
        .await
        .unwrap();
    let voided = payments
        .record_payment(ACTOR, payment(&loan.code, dec!(20000), date(2026, 2, 2)))
        .await
        .unwrap();
    payments.void_payment(ACTOR, &voided.receipt, "duplicate").await.unwrap();

    let summary = LoanService::new(&ledger.ctx)
        .loan_summary(&loan.code, date(2026, 2, 5))
        .await
        .unwrap();
    assert_eq!(summary.payments.len(), 2);
    assert_eq!(summary.payment_count, 1);
    assert_eq!(summary.total_paid, dec!(100000));
    assert_eq!(summary.interest_paid, dec!(48000));
    assert_eq!(summary.principal_paid, dec!(52000));
    assert_eq!(summary.loan.balance, dec!(1148000));
    assert_eq!(summary.lender.code, lender);
    assert_eq!(summary.client.id, client_id);
}

#[tokio::test]
async fn test_simulation() {
    let ledger = ledger().await;
    let schedule = LoanService::new(&ledger.ctx)
        .simulate_loan(dec!(1200000), dec!(4), 12)
        .unwrap();

    assert_eq!(schedule.rows.len(), 12);
    assert_eq!(schedule.monthly_interest, dec!(48000));
    assert_eq!(schedule.rows[0].installment, dec!(148000));
    assert_eq!(schedule.rows[11].installment, dec!(104000));
    assert_eq!(schedule.rows[11].balance, Decimal::ZERO);
    assert_eq!(schedule.total_interest, dec!(312000));
    assert_eq!(schedule.total_to_pay, dec!(1512000));

    let err = LoanService::new(&ledger.ctx)
        .simulate_loan(dec!(1200000), dec!(4), 0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_payment_listing_and_reports() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    let loans = LoanService::new(&ledger.ctx);
    let payments = PaymentService::new(&ledger.ctx);

    let a = loans
        .create_loan(ACTOR, new_loan(&lender, client_id, dec!(1000000)))
        .await
        .unwrap();
    let b = loans
        .create_loan(ACTOR, new_loan(&lender, client_id, dec!(500000)))
        .await
        .unwrap();

    let day = date(2026, 2, 1);
    payments.record_payment(ACTOR, payment(&a.code, dec!(100000), day)).await.unwrap();
    let mut transfer = payment(&b.code, dec!(30000), day);
    transfer.method = PaymentMethod::Transfer;
    payments.record_payment(ACTOR, transfer).await.unwrap();
    let voided = payments
        .record_payment(ACTOR, payment(&b.code, dec!(10000), day))
        .await
        .unwrap();
    payments.void_payment(ACTOR, &voided.receipt, "typo").await.unwrap();
    payments
        .record_payment(ACTOR, payment(&a.code, dec!(50000), date(2026, 2, 3)))
        .await
        .unwrap();

    let listed = payments.list_payments(&PaymentQuery::new().on(day)).await.unwrap();
    assert_eq!(listed.items.len(), 2);
    assert_eq!(listed.totals.total, dec!(130000));

    let with_voided = payments
        .list_payments(&PaymentQuery::new().on(day).with_voided())
        .await
        .unwrap();
    assert_eq!(with_voided.items.len(), 3);
    assert_eq!(with_voided.totals.count, 2);

    let reports = ReportService::new(&ledger.ctx);
    let daily = reports.daily_report(day).await.unwrap();
    assert_eq!(daily.totals.count, 2);
    assert_eq!(daily.totals.total, dec!(130000));
    assert_eq!(daily.by_method.len(), 2);
    assert_eq!(daily.by_method[0].method, PaymentMethod::Cash);
    assert_eq!(daily.by_method[0].total, dec!(100000));

    let stats = reports.payment_stats(None, None, date(2026, 2, 3)).await.unwrap();
    assert_eq!(stats.totals.count, 3);
    assert_eq!(stats.totals.total, dec!(180000));
    assert_eq!(stats.today.total, dec!(50000));
    assert_eq!(stats.last_days.len(), 7);
    assert_eq!(stats.last_days[4].date, day);
    assert_eq!(stats.last_days[4].count, 2);

    let dashboard = reports.dashboard(Some(&lender), day).await.unwrap();
    assert_eq!(dashboard.total_loans, 2);
    assert_eq!(dashboard.active_clients, 1);
    assert_eq!(dashboard.today_payments.total, dec!(130000));
    assert_eq!(dashboard.top_debtors.len(), 1);
    assert_eq!(
        dashboard.total_outstanding,
        dashboard.top_debtors[0].outstanding
    );

    let report = reports
        .loans_report(None, date(2026, 1, 1), date(2026, 1, 31), day)
        .await
        .unwrap();
    assert_eq!(report.total_count, 2);
    assert_eq!(report.total_lent, dec!(1500000));
    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].standing, LoanStanding::Active);

    let ranking = reports.client_debt_ranking(10).await.unwrap();
    assert_eq!(ranking.len(), 1);
    assert_eq!(ranking[0].active_loans, 2);
    assert_eq!(ranking[0].national_id, "1020304050");
}

#[tokio::test]
async fn test_events_are_written() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    let loan = LoanService::new(&ledger.ctx)
        .create_loan(ACTOR, new_loan(&lender, client_id, dec!(100000)))
        .await
        .unwrap();
    PaymentService::new(&ledger.ctx)
        .record_payment(ACTOR, payment(&loan.code, dec!(104000), date(2026, 2, 1)))
        .await
        .unwrap();

    let events = ledger.db.event_reader().read_all().unwrap();
    let types: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
    assert!(types.contains(&EventType::LenderCreated));
    assert!(types.contains(&EventType::ClientCreated));
    assert!(types.contains(&EventType::LoanCreated));
    assert!(types.contains(&EventType::PaymentRecorded));
    assert!(types.contains(&EventType::LoanPaidOff));

    let for_loan = EventFilter::new().entity(&loan.code).apply(events);
    assert!(!for_loan.is_empty());
    assert!(for_loan.iter().all(|e| e.actor_id == ACTOR));
}

#[tokio::test]
async fn test_client_registry() {
    let ledger = ledger().await;
    let (_, client_id) = seed(&ledger.ctx).await;
    let registry = RegistryService::new(&ledger.ctx);
    let other = registry
        .create_client(ACTOR, client_details("5566778899", "Luis", "Perez"))
        .await
        .unwrap();

    let mut details = client_details("1020304050", "Ana Maria", "Gomez");
    details.email = "ana@example.com".to_string();
    let updated = registry.update_client(ACTOR, client_id, details).await.unwrap();
    assert_eq!(updated.first_name, "Ana Maria");
    assert_eq!(updated.email, "ana@example.com");

    let err = registry
        .update_client(ACTOR, other.id, client_details("1020304050", "Luis", "Perez"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let found = registry
        .search_clients(&lendbook_business::ClientQuery::new().search("Maria"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, client_id);

    registry.deactivate_client(ACTOR, other.id).await.unwrap();
    let again = registry.deactivate_client(ACTOR, other.id).await.unwrap();
    assert!(!again.active);
    let active = registry
        .search_clients(&lendbook_business::ClientQuery::new().active(true))
        .await
        .unwrap();
    assert_eq!(active.len(), 1);

    let lenders = registry.list_lenders(true).await.unwrap();
    assert_eq!(lenders.len(), 1);
    assert_eq!(registry.get_lender("PRE001").await.unwrap().default_rate, dec!(4));
}

#[tokio::test]
async fn test_receipt_printed_flag() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    let loan = LoanService::new(&ledger.ctx)
        .create_loan(ACTOR, new_loan(&lender, client_id, dec!(100000)))
        .await
        .unwrap();
    let payments = PaymentService::new(&ledger.ctx);
    let payment = payments
        .record_payment(ACTOR, payment(&loan.code, dec!(10000), date(2026, 2, 1)))
        .await
        .unwrap();
    assert!(!payment.receipt_printed);

    let printed = payments.mark_receipt_printed(ACTOR, &payment.receipt).await.unwrap();
    assert!(printed.receipt_printed);

    let err = payments.mark_receipt_printed(ACTOR, "REC99999999").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_amounts_outside_currency_are_rejected() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    let loans = LoanService::new(&ledger.ctx);

    for amount in [dec!(50000.005), dec!(50000000000000000000000000000)] {
        let err = loans
            .create_loan(ACTOR, new_loan(&lender, client_id, amount))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    let loan = loans.create_loan(ACTOR, new_loan(&lender, client_id, dec!(100000))).await.unwrap();
    let err = PaymentService::new(&ledger.ctx)
        .record_payment(ACTOR, payment(&loan.code, dec!(1000.001), date(2026, 2, 1)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert!(loans.simulate_loan(dec!(100000), dec!(4), 601).is_err());
}

#[tokio::test]
async fn test_prefix_switch_keeps_numbering() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    let with_prefix = |prefix: &str| {
        let settings = LedgerSettings {
            loan_prefix: prefix.to_string(),
            ..LedgerSettings::default()
        };
        ServiceContext::new(&ledger.db, settings)
    };
    let pr = with_prefix("PR");
    let ln = with_prefix("LN");

    let a = LoanService::new(&pr).create_loan(ACTOR, new_loan(&lender, client_id, dec!(100000))).await.unwrap();
    let b = LoanService::new(&ln).create_loan(ACTOR, new_loan(&lender, client_id, dec!(100000))).await.unwrap();
    let c = LoanService::new(&pr).create_loan(ACTOR, new_loan(&lender, client_id, dec!(100000))).await.unwrap();
    assert_eq!(a.code, "PR000001");
    assert_eq!(b.code, "LN000001");
    assert_eq!(c.code, "PR000002");
}

#[tokio::test]
async fn test_update_loan_keeps_amounts() {
    let ledger = ledger().await;
    let (lender, client_id) = seed(&ledger.ctx).await;
    let registry = RegistryService::new(&ledger.ctx);
    let loans = LoanService::new(&ledger.ctx);

    let loan = loans.create_loan(ACTOR, new_loan(&lender, client_id, dec!(1000000))).await.unwrap();
    PaymentService::new(&ledger.ctx)
        .record_payment(ACTOR, payment(&loan.code, dec!(100000), date(2026, 2, 1)))
        .await
        .unwrap();
    let before = loans.get_loan(&loan.code).await.unwrap();

    let own = registry
        .add_codebtor(
            ACTOR,
            client_id,
            NewCoDebtor {
                full_name: "Pedro Gomez".to_string(),
                national_id: "77665544".to_string(),
                phone: "3110000000".to_string(),
                address: "Calle 3".to_string(),
                relationship: "brother".to_string(),
            },
        )
        .await
        .unwrap();

    let mut details = before.details();
    details.codebtor_id = Some(own.id);
    details.term_months = Some(24);
    details.due_date = None;
    details.notes = "Extended term".to_string();
    let updated = loans.update_loan(ACTOR, &loan.code, details).await.unwrap();

    assert_eq!(updated.codebtor_id, Some(own.id));
    assert_eq!(updated.term_months, Some(24));
    assert_eq!(updated.due_date, Some(date(2028, 1, 1)));
    assert_eq!(updated.notes, "Extended term");
    assert_eq!(updated.balance, before.balance);
    assert_eq!(updated.initial_amount, dec!(1000000));
    assert_eq!(updated.rate_percent, before.rate_percent);

    let stored = loans.get_loan(&loan.code).await.unwrap();
    assert_eq!(stored.balance, before.balance);
    assert_eq!(stored.due_date, Some(date(2028, 1, 1)));

    // Co-debtor of another client
    let other = registry
        .create_client(ACTOR, client_details("5566778899", "Luis", "Perez"))
        .await
        .unwrap();
    let foreign = registry
        .add_codebtor(
            ACTOR,
            other.id,
            NewCoDebtor {
                full_name: "Marta Perez".to_string(),
                national_id: "99887766".to_string(),
                phone: "3100000000".to_string(),
                address: "Carrera 5".to_string(),
                relationship: "sister".to_string(),
            },
        )
        .await
        .unwrap();
    let mut details = stored.details();
    details.codebtor_id = Some(foreign.id);
    let err = loans.update_loan(ACTOR, &loan.code, details).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = loans.update_loan(ACTOR, "PR999999", stored.details()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let events = ledger.db.event_reader().read_all().unwrap();
    assert!(events.iter().any(|e| e.event_type == EventType::LoanUpdated && e.entity_id == loan.code));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_on_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite:{}", dir.path().join("ledger.db").display());
    let db = Database::init_with_migrations(&db_url, dir.path().join("events"))
        .await
        .unwrap();
    let settings = LedgerSettings {
        max_conflict_retries: 50,
        ..LedgerSettings::default()
    };
    let ctx = Arc::new(ServiceContext::new(&db, settings));
    let (lender, client_id) = seed(&ctx).await;

    // Parallel loan creation: every code is distinct
    let mut handles = Vec::new();
    for _ in 0..8 {
        let ctx = Arc::clone(&ctx);
        let request = new_loan(&lender, client_id, dec!(1000000));
        handles.push(tokio::spawn(async move {
            LoanService::new(&ctx).create_loan(ACTOR, request).await
        }));
    }
    let mut codes = HashSet::new();
    for handle in handles {
        codes.insert(handle.await.unwrap().unwrap().code);
    }
    assert_eq!(codes.len(), 8);

    // Parallel payments on one loan
    let code = "PR000001".to_string();
    let mut handles = Vec::new();
    for _ in 0..10 {
        let ctx = Arc::clone(&ctx);
        let request = payment(&code, dec!(50000), date(2026, 2, 1));
        handles.push(tokio::spawn(async move {
            PaymentService::new(&ctx).record_payment(ACTOR, request).await
        }));
    }
    let mut recorded = Vec::new();
    for handle in handles {
        recorded.push(handle.await.unwrap().unwrap());
    }
    let receipts: HashSet<&str> = recorded.iter().map(|p| p.receipt.as_str()).collect();
    assert_eq!(receipts.len(), 10);

    let principal: Decimal = recorded.iter().map(|p| p.principal).sum();
    let loan = LoanService::new(&ctx).get_loan(&code).await.unwrap();
    assert_eq!(loan.balance, dec!(1000000) - principal);

    // Parallel voids of the same receipt: exactly one takes effect
    let target = recorded[0].clone();
    let mut handles = Vec::new();
    for _ in 0..6 {
        let ctx = Arc::clone(&ctx);
        let receipt = target.receipt.clone();
        handles.push(tokio::spawn(async move {
            PaymentService::new(&ctx).void_payment(ACTOR, &receipt, "Duplicate").await
        }));
    }
    let mut applied = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            applied += 1;
        }
    }
    assert_eq!(applied, 1);

    let loan = LoanService::new(&ctx).get_loan(&code).await.unwrap();
    assert_eq!(loan.balance, dec!(1000000) - principal + target.principal);
}
