//! Database initialization, status and service wiring

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use lendbook_business::ServiceContext;
use lendbook_core::{LedgerSettings, SequenceKind};
use lendbook_persistence::{Database, SequenceRepo};
use std::path::Path;
use tracing::debug;

use crate::Cli;

/// An open database with the services' context
pub struct Ledger {
    pub db: Database,
    pub ctx: ServiceContext,
}

fn db_url(db_path: &Path) -> String {
    format!("sqlite:{}", db_path.display())
}

/// Local calendar date used for overdue and due-soon checks
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Settings from `--config`, or the defaults
pub fn load_settings(config: Option<&Path>) -> Result<LedgerSettings> {
    match config {
        Some(path) => LedgerSettings::from_json_file(path)
            .with_context(|| format!("Failed to load settings from {:?}", path)),
        None => Ok(LedgerSettings::default()),
    }
}

/// Create the database file and run migrations
pub async fn init_database(cli: &Cli, force: bool) -> Result<()> {
    if force && cli.db.exists() {
        std::fs::remove_file(&cli.db).context("Failed to remove existing database")?;
        println!("🗑️  Removed existing database");
    }
    if let Some(parent) = cli.db.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let db = Database::init_with_migrations(&db_url(&cli.db), &cli.events_dir)
        .await
        .context("Failed to initialize database")?;
    db.pool().close().await;
    Ok(())
}

/// Open an existing database
pub async fn open(cli: &Cli) -> Result<Ledger> {
    if !cli.db.exists() {
        bail!("Database not found at {:?}. Run 'lendbook init' first.", cli.db);
    }
    let settings = load_settings(cli.config.as_deref())?;
    debug!(db = ?cli.db, events = ?cli.events_dir, ?settings, "Opening ledger");

    let db = Database::new(&db_url(&cli.db), &cli.events_dir)
        .await
        .context("Failed to connect to database")?;
    let ctx = ServiceContext::new(&db, settings);
    Ok(Ledger { db, ctx })
}

/// Show database status
pub async fn show_status(cli: &Cli) -> Result<()> {
    if !cli.db.exists() {
        println!("❌ Database not found at {:?}", cli.db);
        println!("   Run 'lendbook init' to create the database");
        return Ok(());
    }

    let ledger = open(cli).await?;
    let pool = ledger.db.pool();

    println!("📊 Database Status");
    println!("   Path:   {:?}", cli.db);
    println!("   Events: {:?}", cli.events_dir);
    println!();

    for (label, table) in [
        ("Lenders", "lenders"),
        ("Clients", "clients"),
        ("Co-debtors", "codebtors"),
        ("Loans", "loans"),
        ("Payments", "payments"),
    ] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .with_context(|| format!("Failed to count {}", table))?;
        println!("   {:<12} {}", format!("{}:", label), count);
    }

    println!();
    for kind in [SequenceKind::Lender, SequenceKind::Loan, SequenceKind::Receipt] {
        let sequence = ledger.ctx.settings().sequence(kind);
        let last = SequenceRepo::last_code(pool, &sequence).await?;
        println!(
            "   Last {:<8} {}",
            format!("{}:", kind),
            last.as_deref().unwrap_or("-")
        );
    }

    pool.close().await;
    Ok(())
}
