//! Report commands

use anyhow::Result;
use lendbook_business::{LoanOverview, ReportService};
use lendbook_reports::{DailyCollectionReport, DashboardReport, LoanPortfolioReport};

use super::{emit, truncate};
use crate::db::{self, Ledger};
use crate::ReportAction;

/// Handle report subcommands
pub async fn handle(ledger: &Ledger, action: &ReportAction) -> Result<()> {
    let reports = ReportService::new(&ledger.ctx);
    let today = db::today();

    match action {
        ReportAction::Daily { date, export } => {
            let daily = reports.daily_report(date.unwrap_or(today)).await?;
            let report = DailyCollectionReport::new(daily);
            if emit(&report, export)? {
                return Ok(());
            }

            let daily = &report.report;
            println!("💰 Collections of {}", daily.date);
            println!("   Payments:  {}", daily.totals.count);
            println!("   Total:     {}", daily.totals.total);
            println!("   Interest:  {}", daily.totals.interest);
            println!("   Principal: {}", daily.totals.principal);
            if !daily.by_method.is_empty() {
                println!("\n--- By method ---");
                for m in &daily.by_method {
                    println!("   {:<10} {:>4} {:>14}", m.method.as_str(), m.count, m.total.to_string());
                }
            }
            if !daily.payments.is_empty() {
                println!("\n--- Payments ---");
                for view in &daily.payments {
                    let p = &view.payment;
                    println!(
                        "   {:<12} {:<10} {:<22} {:>12}{}",
                        p.receipt,
                        view.loan_code,
                        truncate(&view.client_name, 22),
                        p.total.to_string(),
                        if p.voided { "  (voided)" } else { "" }
                    );
                }
            }
        }

        ReportAction::Stats { from, to } => {
            let stats = reports.payment_stats(*from, *to, today).await?;

            println!("📈 Payment statistics");
            match (stats.from, stats.to) {
                (None, None) => println!("   Range:     all time"),
                (from, to) => println!(
                    "   Range:     {} .. {}",
                    from.map(|d| d.to_string()).unwrap_or_default(),
                    to.map(|d| d.to_string()).unwrap_or_default()
                ),
            }
            println!("   Payments:  {}", stats.totals.count);
            println!("   Total:     {}", stats.totals.total);
            println!("   Interest:  {}", stats.totals.interest);
            println!("   Principal: {}", stats.totals.principal);
            println!("   Today:     {} ({} payments)", stats.today.total, stats.today.count);

            println!("\n--- Last 7 days ---");
            for day in &stats.last_days {
                println!("   {} {:>4} {:>14}", day.date, day.count, day.total.to_string());
            }
        }

        ReportAction::Dashboard { lender, export } => {
            let dashboard = reports.dashboard(lender.as_deref(), today).await?;
            let report = DashboardReport::new(dashboard);
            if emit(&report, export)? {
                return Ok(());
            }

            let d = &report.dashboard;
            println!("📊 {}", report.title);
            println!("   Loans:          {}", d.total_loans);
            println!("   Outstanding:    {}", d.total_outstanding);
            println!("   Active clients: {}", d.active_clients);
            println!(
                "   Today:          {} ({} payments)",
                d.today_payments.total, d.today_payments.count
            );

            println!("\n--- By standing ---");
            for s in &d.by_standing {
                println!("   {:<11} {:>5} {:>16}", s.standing.as_str(), s.count, s.balance.to_string());
            }

            print_section("Recent loans", &d.recent_loans);
            print_section("Due soon", &d.due_soon);
            print_section("Delinquent", &d.delinquent);

            if !d.top_debtors.is_empty() {
                println!("\n--- Top debtors ---");
                for debtor in &d.top_debtors {
                    println!(
                        "   {:<26} {:<14} {:>3} loans {:>16}",
                        truncate(&debtor.client_name, 26),
                        debtor.national_id,
                        debtor.active_loans,
                        debtor.outstanding.to_string()
                    );
                }
            }
        }

        ReportAction::Loans {
            from,
            to,
            lender,
            export,
        } => {
            let loans = reports.loans_report(lender.as_deref(), *from, *to, today).await?;
            let report = LoanPortfolioReport::new(loans);
            if emit(&report, export)? {
                return Ok(());
            }

            let r = &report.report;
            println!("📚 {}", report.title);
            println!("   Loans:       {}", r.total_count);
            println!("   Lent:        {}", r.total_lent);
            println!("   Outstanding: {}", r.total_outstanding);
            for group in &r.groups {
                print_section(
                    &format!(
                        "{} ({} loans, lent {}, outstanding {})",
                        group.standing, group.count, group.lent, group.outstanding
                    ),
                    &group.loans,
                );
            }
        }
    }

    Ok(())
}

fn print_section(title: &str, items: &[LoanOverview]) {
    if items.is_empty() {
        return;
    }
    println!("\n--- {} ---", title);
    for item in items {
        println!(
            "   {:<10} {:<24} {:>14} {:<10} {:>4}d",
            item.loan.code,
            truncate(&item.client_name, 24),
            item.loan.balance.to_string(),
            item.loan.due_date.map(|d| d.to_string()).unwrap_or_default(),
            item.days_overdue
        );
    }
}
