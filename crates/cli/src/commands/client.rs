//! Client and co-debtor commands

use anyhow::Result;
use lendbook_business::{ClientQuery, LoanFilter, LoanService, RegistryService};
use lendbook_core::{ClientDetails, NewCoDebtor};

use super::{text, truncate};
use crate::db::{self, Ledger};
use crate::{ClientAction, CoDebtorAction};

/// Handle client subcommands
pub async fn handle(ledger: &Ledger, actor: &str, action: &ClientAction) -> Result<()> {
    let registry = RegistryService::new(&ledger.ctx);

    match action {
        ClientAction::Create {
            first_name,
            last_name,
            national_id,
            address,
            address2,
            phone,
            phone2,
            email,
            notes,
        } => {
            let details = ClientDetails {
                first_name: first_name.clone(),
                last_name: last_name.clone(),
                national_id: national_id.clone(),
                primary_address: address.clone(),
                secondary_address: text(address2),
                phone: phone.clone(),
                alternate_phone: text(phone2),
                email: text(email),
                notes: text(notes),
            };
            let client = registry.create_client(actor, details).await?;

            println!("✅ Created client:");
            println!("   ID:          {}", client.id);
            println!("   Name:        {}", client.full_name());
            println!("   National ID: {}", client.national_id);
            println!("   Phone:       {}", client.phone);
        }

        ClientAction::List { search, all, limit } => {
            let mut query = ClientQuery::new();
            if let Some(term) = search {
                query = query.search(term);
            }
            if !*all {
                query = query.active(true);
            }
            if let Some(limit) = limit {
                query = query.limit(*limit);
            }

            let clients = registry.search_clients(&query).await?;
            if clients.is_empty() {
                println!("No clients found.");
                return Ok(());
            }

            println!(
                "{:>6} {:<28} {:<14} {:<14} {:<8}",
                "ID", "NAME", "NATIONAL ID", "PHONE", "STATUS"
            );
            println!("{}", "-".repeat(74));
            for client in &clients {
                println!(
                    "{:>6} {:<28} {:<14} {:<14} {:<8}",
                    client.id,
                    truncate(&client.full_name(), 28),
                    client.national_id,
                    client.phone,
                    if client.active { "active" } else { "inactive" }
                );
            }
            println!("\nTotal: {} clients", clients.len());
        }

        ClientAction::Show { client_id } => {
            let client = registry.get_client(*client_id).await?;
            let codebtors = registry.list_codebtors(*client_id).await?;
            let loans = LoanService::new(&ledger.ctx)
                .list_loans(&LoanFilter::new().client(*client_id), db::today())
                .await?;

            println!("👤 Client {}", client.id);
            println!("   Name:        {}", client.full_name());
            println!("   National ID: {}", client.national_id);
            println!("   Address:     {}", client.primary_address);
            if !client.secondary_address.is_empty() {
                println!("                {}", client.secondary_address);
            }
            println!("   Phone:       {}", client.phone);
            if !client.alternate_phone.is_empty() {
                println!("                {}", client.alternate_phone);
            }
            if !client.email.is_empty() {
                println!("   Email:       {}", client.email);
            }
            println!("   Status:      {}", if client.active { "active" } else { "inactive" });

            if !codebtors.is_empty() {
                println!("\n--- Co-debtors ---");
                for c in &codebtors {
                    println!("   #{:<4} {} ({}) - {} - {}", c.id, c.full_name, c.relationship, c.national_id, c.phone);
                }
            }

            if !loans.is_empty() {
                println!("\n--- Loans ---");
                println!("{:<10} {:>14} {:>14} {:<12}", "CODE", "AMOUNT", "BALANCE", "STANDING");
                for item in &loans {
                    println!(
                        "{:<10} {:>14} {:>14} {:<12}",
                        item.loan.code,
                        item.loan.initial_amount.to_string(),
                        item.loan.balance.to_string(),
                        item.standing.as_str()
                    );
                }
            }
        }

        ClientAction::Deactivate { client_id } => {
            let client = registry.deactivate_client(actor, *client_id).await?;
            println!("✅ Client {} ({}) is inactive", client.id, client.full_name());
        }
    }

    Ok(())
}

/// Handle co-debtor subcommands
pub async fn handle_codebtor(ledger: &Ledger, actor: &str, action: &CoDebtorAction) -> Result<()> {
    let registry = RegistryService::new(&ledger.ctx);

    match action {
        CoDebtorAction::Add {
            client,
            full_name,
            national_id,
            phone,
            address,
            relationship,
        } => {
            let codebtor = registry
                .add_codebtor(
                    actor,
                    *client,
                    NewCoDebtor {
                        full_name: full_name.clone(),
                        national_id: national_id.clone(),
                        phone: phone.clone(),
                        address: address.clone(),
                        relationship: relationship.clone(),
                    },
                )
                .await?;

            println!("✅ Added co-debtor #{} to client {}", codebtor.id, codebtor.client_id);
            println!("   {}", codebtor);
        }
    }

    Ok(())
}
