//! Payment commands

use anyhow::Result;
use lendbook_business::{LoanService, PaymentList, PaymentQuery, PaymentService};
use lendbook_core::NewPayment;
use lendbook_reports::PaymentListReport;

use super::{emit, text, truncate};
use crate::db::{self, Ledger};
use crate::PaymentAction;

/// Handle payment subcommands
pub async fn handle(ledger: &Ledger, actor: &str, action: &PaymentAction) -> Result<()> {
    let payments = PaymentService::new(&ledger.ctx);

    match action {
        PaymentAction::Record {
            loan_code,
            total,
            interest,
            principal,
            method,
            date,
            reference,
            notes,
            scan,
        } => {
            let new = NewPayment {
                loan_code: loan_code.clone(),
                total: *total,
                interest: *interest,
                principal: *principal,
                method: method.to_core_type(),
                date: date.unwrap_or_else(db::today),
                reference: text(reference),
                notes: text(notes),
                receipt_scan: scan.clone(),
            };
            let payment = payments.record_payment(actor, new).await?;
            let loan = LoanService::new(&ledger.ctx).get_loan(loan_code).await?;

            println!("✅ Payment recorded:");
            println!("   Receipt:   {}", payment.receipt);
            println!("   Loan:      {}", loan.code);
            println!("   Total:     {} ({})", payment.total, payment.method);
            println!("   Interest:  {}", payment.interest);
            println!("   Principal: {}", payment.principal);
            println!("   Balance:   {} ({})", loan.balance, loan.status);
        }

        PaymentAction::List {
            search,
            loan,
            method,
            from,
            to,
            include_voided,
            limit,
            export,
        } => {
            let mut query = PaymentQuery::new();
            if let Some(term) = search {
                query = query.search(term);
            }
            if let Some(code) = loan {
                let loan = LoanService::new(&ledger.ctx).get_loan(code).await?;
                query = query.loan(loan.id);
            }
            if let Some(method) = method {
                query = query.method(method.to_core_type());
            }
            query.from = *from;
            query.to = *to;
            if *include_voided {
                query = query.with_voided();
            }
            if let Some(limit) = limit {
                query = query.limit(*limit);
            }

            let list = payments.list_payments(&query).await?;
            let report = PaymentListReport::new("Payments", list);
            if !emit(&report, export)? {
                print_payments(&report.list);
            }
        }

        PaymentAction::Show { receipt, printed } => {
            if *printed {
                payments.mark_receipt_printed(actor, receipt).await?;
            }
            let view = payments.get_payment(receipt).await?;
            let p = &view.payment;

            println!("🧾 Receipt {}", p.receipt);
            println!("   Loan:      {} ({})", view.loan_code, view.client_name);
            println!("   Date:      {}", p.date);
            println!("   Method:    {}", p.method);
            println!("   Total:     {}", p.total);
            println!("   Interest:  {}", p.interest);
            println!("   Principal: {}", p.principal);
            println!("   Kind:      {}", p.kind);
            if !p.reference.is_empty() {
                println!("   Reference: {}", p.reference);
            }
            if let Some(scan) = &p.receipt_scan {
                println!("   Scan:      {}", scan);
            }
            println!("   Printed:   {}", if p.receipt_printed { "yes" } else { "no" });
            println!("   By:        {} at {}", p.created_by, p.created_at.to_rfc3339());
            if p.voided {
                println!(
                    "   VOIDED:    {} (by {})",
                    p.void_reason,
                    p.voided_by.as_deref().unwrap_or("-")
                );
            }
        }

        PaymentAction::Void { receipt, reason } => {
            if payments.void_payment(actor, receipt, reason).await? {
                let view = payments.get_payment(receipt).await?;
                let loan = LoanService::new(&ledger.ctx).get_loan(&view.loan_code).await?;
                println!("✅ Payment {} voided", receipt);
                println!("   Loan {} balance: {} ({})", loan.code, loan.balance, loan.status);
            } else {
                println!("ℹ️  Payment {} was already voided", receipt);
            }
        }
    }

    Ok(())
}

fn print_payments(list: &PaymentList) {
    if list.items.is_empty() {
        println!("No payments found.");
        return;
    }

    println!(
        "{:<12} {:<10} {:<10} {:<22} {:<9} {:>12} {:>12} {:>12}",
        "RECEIPT", "DATE", "LOAN", "CLIENT", "METHOD", "TOTAL", "INTEREST", "PRINCIPAL"
    );
    println!("{}", "-".repeat(106));
    for view in &list.items {
        let p = &view.payment;
        println!(
            "{:<12} {:<10} {:<10} {:<22} {:<9} {:>12} {:>12} {:>12}{}",
            p.receipt,
            p.date.to_string(),
            view.loan_code,
            truncate(&view.client_name, 22),
            p.method.as_str(),
            p.total.to_string(),
            p.interest.to_string(),
            p.principal.to_string(),
            if p.voided { "  (voided)" } else { "" }
        );
    }
    println!("{}", "-".repeat(106));
    println!(
        "Total: {} payments, {} (interest {}, principal {})",
        list.totals.count, list.totals.total, list.totals.interest, list.totals.principal
    );
}
