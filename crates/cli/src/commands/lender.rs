//! Lender commands

use anyhow::Result;
use lendbook_business::RegistryService;
use lendbook_core::NewLender;

use crate::db::Ledger;
use crate::LenderAction;

/// Handle lender subcommands
pub async fn handle(ledger: &Ledger, actor: &str, action: &LenderAction) -> Result<()> {
    let registry = RegistryService::new(&ledger.ctx);

    match action {
        LenderAction::Create {
            first_name,
            last_name,
            national_id,
            rate,
        } => {
            let lender = registry
                .create_lender(
                    actor,
                    NewLender {
                        first_name: first_name.clone(),
                        last_name: last_name.clone(),
                        national_id: national_id.clone(),
                        default_rate: *rate,
                    },
                )
                .await?;

            println!("✅ Created lender:");
            println!("   Code:        {}", lender.code);
            println!("   Name:        {}", lender.full_name());
            println!("   National ID: {}", lender.national_id);
            println!("   Rate:        {}%", lender.default_rate);
        }

        LenderAction::List { all } => {
            let lenders = registry.list_lenders(!*all).await?;
            if lenders.is_empty() {
                println!("No lenders found.");
                return Ok(());
            }

            println!("{:<8} {:<28} {:<14} {:>8} {:<8}", "CODE", "NAME", "NATIONAL ID", "RATE %", "STATUS");
            println!("{}", "-".repeat(70));
            for lender in &lenders {
                println!(
                    "{:<8} {:<28} {:<14} {:>8} {:<8}",
                    lender.code,
                    super::truncate(&lender.full_name(), 28),
                    lender.national_id,
                    lender.default_rate,
                    if lender.active { "active" } else { "inactive" }
                );
            }
            println!("\nTotal: {} lenders", lenders.len());
        }
    }

    Ok(())
}
