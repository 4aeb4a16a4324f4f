//! Loan commands

use anyhow::Result;
use lendbook_business::{LoanFilter, LoanOverview, LoanService};
use lendbook_core::NewLoan;
use lendbook_reports::ScheduleReport;

use super::{emit, text, truncate};
use crate::db::{self, Ledger};
use crate::LoanAction;

/// Handle loan subcommands
pub async fn handle(ledger: &Ledger, actor: &str, action: &LoanAction) -> Result<()> {
    let loans = LoanService::new(&ledger.ctx);
    let today = db::today();

    match action {
        LoanAction::Create {
            client,
            lender,
            amount,
            rate,
            timing,
            codebtor,
            start,
            due,
            term,
            note_photo,
            note_photo_back,
            notes,
        } => {
            let new = NewLoan {
                client_id: *client,
                lender_code: lender.clone(),
                codebtor_id: *codebtor,
                initial_amount: *amount,
                rate_percent: *rate,
                interest_timing: timing.to_core_type(),
                start_date: start.unwrap_or(today),
                due_date: *due,
                term_months: *term,
                note_photo: note_photo.clone(),
                note_photo_back: note_photo_back.clone(),
                notes: text(notes),
            };
            let loan = loans.create_loan(actor, new).await?;

            println!("✅ Created loan {}:", loan.code);
            println!("   Client:   {}", loan.client_id);
            println!("   Lender:   {}", loan.lender_code);
            println!("   Amount:   {}", loan.initial_amount);
            println!("   Rate:     {}% ({})", loan.rate_percent, loan.interest_timing);
            println!("   Interest: {} per month", loan.monthly_interest());
            println!("   Start:    {}", loan.start_date);
            if let Some(due) = loan.due_date {
                println!("   Due:      {}", due);
            }
        }

        LoanAction::List {
            search,
            lender,
            client,
            standing,
            from,
            to,
            limit,
        } => {
            let mut filter = LoanFilter::new();
            if let Some(term) = search {
                filter = filter.search(term);
            }
            if let Some(code) = lender {
                filter = filter.lender(code);
            }
            if let Some(id) = client {
                filter = filter.client(*id);
            }
            if let Some(standing) = standing {
                filter = filter.standing(standing.to_core_type());
            }
            filter.started_from = *from;
            filter.started_to = *to;
            filter = filter.limit(limit.unwrap_or(ledger.ctx.settings().list_limit));

            let items = loans.list_loans(&filter, today).await?;
            print_loans(&items);
        }

        LoanAction::Edit {
            code,
            timing,
            codebtor,
            no_codebtor,
            due,
            term,
            note_photo,
            note_photo_back,
            notes,
        } => {
            let mut details = loans.get_loan(code).await?.details();
            if let Some(timing) = timing {
                details.interest_timing = timing.to_core_type();
            }
            if *no_codebtor {
                details.codebtor_id = None;
            } else if codebtor.is_some() {
                details.codebtor_id = *codebtor;
            }
            if term.is_some() {
                details.term_months = *term;
                details.due_date = None;
            }
            if due.is_some() {
                details.due_date = *due;
            }
            if note_photo.is_some() {
                details.note_photo = note_photo.clone();
            }
            if note_photo_back.is_some() {
                details.note_photo_back = note_photo_back.clone();
            }
            if let Some(notes) = notes {
                details.notes = notes.clone();
            }

            let loan = loans.update_loan(actor, code, details).await?;
            println!("✅ Updated loan {}", loan.code);
            println!("   Balance: {}", loan.balance);
            if let Some(due) = loan.due_date {
                println!("   Due:     {}", due);
            }
        }

        LoanAction::Show { code } => {
            let summary = loans.loan_summary(code, today).await?;
            let loan = &summary.loan;

            println!("📄 Loan {}", loan.code);
            println!("   Client:       {} ({})", summary.client.full_name(), summary.client.national_id);
            println!("   Lender:       {} ({})", summary.lender.full_name(), summary.lender.code);
            if let Some(c) = &summary.codebtor {
                println!("   Co-debtor:    {}", c);
            }
            println!("   Amount:       {}", loan.initial_amount);
            println!("   Balance:      {}", loan.balance);
            println!("   Rate:         {}% ({})", loan.rate_percent, loan.interest_timing);
            println!("   Interest due: {}", summary.interest_due);
            println!("   Start:        {}", loan.start_date);
            if let Some(due) = loan.due_date {
                println!("   Due:          {}", due);
            }
            println!("   Standing:     {}", summary.standing);
            if summary.days_overdue > 0 {
                println!("   Days overdue: {}", summary.days_overdue);
            }
            if let Some(reason) = &loan.cancel_reason {
                println!("   Cancelled:    {}", reason);
            }

            println!(
                "\n   Paid: {} in {} payments (interest {}, principal {})",
                summary.total_paid, summary.payment_count, summary.interest_paid, summary.principal_paid
            );

            if !summary.payments.is_empty() {
                println!("\n--- Payments ---");
                println!(
                    "{:<12} {:<10} {:>12} {:>12} {:>12} {:<8}",
                    "RECEIPT", "DATE", "TOTAL", "INTEREST", "PRINCIPAL", "STATUS"
                );
                for p in &summary.payments {
                    println!(
                        "{:<12} {:<10} {:>12} {:>12} {:>12} {:<8}",
                        p.receipt,
                        p.date.to_string(),
                        p.total.to_string(),
                        p.interest.to_string(),
                        p.principal.to_string(),
                        if p.voided { "voided" } else { "" }
                    );
                }
            }
        }

        LoanAction::Cancel { code, reason } => {
            let loan = loans.cancel_loan(actor, code, reason).await?;
            println!("✅ Loan {} cancelled (balance {})", loan.code, loan.balance);
        }

        LoanAction::Simulate {
            amount,
            rate,
            term,
            export,
        } => {
            let schedule = loans.simulate_loan(*amount, *rate, *term)?;
            let report = ScheduleReport::new(schedule);
            if emit(&report, export)? {
                return Ok(());
            }

            let schedule = &report.schedule;
            println!("🧮 {}", report.title);
            println!(
                "{:>5} {:>14} {:>14} {:>14} {:>14}",
                "MONTH", "INSTALLMENT", "INTEREST", "PRINCIPAL", "BALANCE"
            );
            println!("{}", "-".repeat(65));
            for row in &schedule.rows {
                println!(
                    "{:>5} {:>14} {:>14} {:>14} {:>14}",
                    row.month,
                    row.installment.to_string(),
                    row.interest.to_string(),
                    row.principal.to_string(),
                    row.balance.to_string()
                );
            }
            println!("{}", "-".repeat(65));
            println!("   Monthly interest: {}", schedule.monthly_interest);
            println!("   Total interest:   {}", schedule.total_interest);
            println!("   Total to pay:     {}", schedule.total_to_pay);
        }

        LoanAction::Overdue => {
            let items = loans.overdue_loans(today).await?;
            print_loans(&items);
        }

        LoanAction::DueSoon { days } => {
            let days = days.unwrap_or(ledger.ctx.settings().due_soon_days);
            let items = loans.loans_due_soon(today, days).await?;
            println!("📅 Due within {} days of {}", days, today);
            print_loans(&items);
        }
    }

    Ok(())
}

fn print_loans(items: &[LoanOverview]) {
    if items.is_empty() {
        println!("No loans found.");
        return;
    }

    println!(
        "{:<10} {:<24} {:<7} {:>12} {:>12} {:<10} {:<11} {:>5}",
        "CODE", "CLIENT", "LENDER", "AMOUNT", "BALANCE", "DUE", "STANDING", "DAYS"
    );
    println!("{}", "-".repeat(98));
    for item in items {
        let loan = &item.loan;
        println!(
            "{:<10} {:<24} {:<7} {:>12} {:>12} {:<10} {:<11} {:>5}",
            loan.code,
            truncate(&item.client_name, 24),
            loan.lender_code,
            loan.initial_amount.to_string(),
            loan.balance.to_string(),
            loan.due_date.map(|d| d.to_string()).unwrap_or_default(),
            item.standing.as_str(),
            item.days_overdue
        );
    }
    println!("\nTotal: {} loans", items.len());
}
