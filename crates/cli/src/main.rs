//! Lendbook CLI - loan and payment ledger from the command line
//!
//! Usage:
//! ```bash
//! lendbook init
//! lendbook lender create --first-name Carlos --last-name Ruiz --national-id 80000001 --rate 4
//! lendbook client create --first-name Ana --last-name Gomez --national-id 1020304050 \
//!     --address "Calle 10" --phone 3001234567
//! lendbook loan create --client 1 --lender PRE001 --amount 1200000 --term 12
//! lendbook payment record PR000001 100000 --method cash
//! lendbook report daily --format markdown --output daily.md
//! lendbook audit --entity PR000001
//! ```

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod db;

use commands::{audit, client, lender, loan, payment, report};

/// Lendbook - personal loan ledger with SQLite state and a JSONL audit log
#[derive(Parser)]
#[command(name = "lendbook")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file path
    #[arg(long, env = "LENDBOOK_DB", default_value = "data/lendbook.db", global = true)]
    pub db: PathBuf,

    /// Events directory path
    #[arg(long, env = "LENDBOOK_EVENTS", default_value = "data/events", global = true)]
    pub events_dir: PathBuf,

    /// Ledger settings (JSON)
    #[arg(long, env = "LENDBOOK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Name recorded as the actor of every change
    #[arg(long, default_value = "admin", global = true)]
    pub actor: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and run migrations
    Init {
        /// Delete an existing database first
        #[arg(long)]
        force: bool,
    },

    /// Show database status
    Status,

    /// Lender management
    Lender {
        #[command(subcommand)]
        action: LenderAction,
    },

    /// Client management
    Client {
        #[command(subcommand)]
        action: ClientAction,
    },

    /// Co-debtors of a client
    Codebtor {
        #[command(subcommand)]
        action: CoDebtorAction,
    },

    /// Loans
    Loan {
        #[command(subcommand)]
        action: LoanAction,
    },

    /// Payments
    Payment {
        #[command(subcommand)]
        action: PaymentAction,
    },

    /// Generate reports
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },

    /// List audit events
    Audit {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Loan code, receipt, lender code or client id
        #[arg(long)]
        entity: Option<String>,
        /// Only events recorded by this actor
        #[arg(long = "by")]
        by: Option<String>,
        /// Event types (comma-separated, e.g. payment_recorded,payment_voided)
        #[arg(long, value_delimiter = ',')]
        types: Option<Vec<String>>,
        #[command(flatten)]
        export: ExportArgs,
    },
}

#[derive(Subcommand)]
pub enum LenderAction {
    /// Register a lender
    Create {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        national_id: String,
        /// Default monthly rate in percent
        #[arg(long)]
        rate: Decimal,
    },
    /// List lenders
    List {
        /// Include inactive lenders
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
pub enum ClientAction {
    /// Register a client
    Create {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        national_id: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        address2: Option<String>,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        phone2: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Search clients
    List {
        /// Name, national id or phone
        #[arg(long, short)]
        search: Option<String>,
        /// Include inactive clients
        #[arg(long)]
        all: bool,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show a client with co-debtors and loans
    Show { client_id: i64 },
    /// Deactivate a client
    Deactivate { client_id: i64 },
}

#[derive(Subcommand)]
pub enum CoDebtorAction {
    /// Add a co-debtor to a client
    Add {
        #[arg(long)]
        client: i64,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        national_id: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        relationship: String,
    },
}

#[derive(Subcommand)]
pub enum LoanAction {
    /// Open a loan
    Create {
        #[arg(long)]
        client: i64,
        #[arg(long)]
        lender: String,
        #[arg(long)]
        amount: Decimal,
        /// Monthly rate in percent (defaults to the lender's rate)
        #[arg(long)]
        rate: Option<Decimal>,
        #[arg(long, default_value = "due")]
        timing: InterestTimingArg,
        #[arg(long)]
        codebtor: Option<i64>,
        /// Start date (defaults to today)
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Term in months
        #[arg(long)]
        term: Option<u32>,
        /// Promissory note photo reference
        #[arg(long)]
        note_photo: Option<String>,
        #[arg(long)]
        note_photo_back: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List loans
    List {
        /// Code, client name or national id
        #[arg(long, short)]
        search: Option<String>,
        #[arg(long)]
        lender: Option<String>,
        #[arg(long)]
        client: Option<i64>,
        #[arg(long)]
        standing: Option<StandingArg>,
        /// Started on or after
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Started on or before
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show a loan with its payments
    Show { code: String },
    /// Edit a loan's co-debtor, dates, note photos or notes
    Edit {
        code: String,
        #[arg(long)]
        timing: Option<InterestTimingArg>,
        #[arg(long, conflicts_with = "no_codebtor")]
        codebtor: Option<i64>,
        /// Remove the co-debtor
        #[arg(long)]
        no_codebtor: bool,
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Term in months (the due date follows it unless --due is given)
        #[arg(long)]
        term: Option<u32>,
        #[arg(long)]
        note_photo: Option<String>,
        #[arg(long)]
        note_photo_back: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Cancel an active loan
    Cancel {
        code: String,
        #[arg(long)]
        reason: String,
    },
    /// Simulate a repayment schedule
    Simulate {
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        rate: Decimal,
        #[arg(long)]
        term: u32,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Active loans past their due date
    Overdue,
    /// Active loans falling due soon
    DueSoon {
        /// Window in days (defaults to the configured window)
        #[arg(long)]
        days: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum PaymentAction {
    /// Record a payment
    Record {
        loan_code: String,
        total: Decimal,
        /// Interest portion (with --principal; both empty means automatic split)
        #[arg(long)]
        interest: Option<Decimal>,
        #[arg(long)]
        principal: Option<Decimal>,
        #[arg(long, default_value = "cash")]
        method: MethodArg,
        /// Payment date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        reference: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Receipt scan reference
        #[arg(long)]
        scan: Option<String>,
    },
    /// List payments
    List {
        /// Receipt, loan code or client name
        #[arg(long, short)]
        search: Option<String>,
        #[arg(long)]
        loan: Option<String>,
        #[arg(long)]
        method: Option<MethodArg>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        include_voided: bool,
        #[arg(long)]
        limit: Option<u32>,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Show a payment
    Show {
        receipt: String,
        /// Mark the receipt as printed
        #[arg(long)]
        printed: bool,
    },
    /// Void a payment
    Void {
        receipt: String,
        #[arg(long)]
        reason: String,
    },
}

#[derive(Subcommand)]
pub enum ReportAction {
    /// Collections of one day
    Daily {
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Payment statistics
    Stats {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Portfolio dashboard
    Dashboard {
        #[arg(long)]
        lender: Option<String>,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Loans started in a date range, by standing
    Loans {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long)]
        lender: Option<String>,
        #[command(flatten)]
        export: ExportArgs,
    },
}

/// Output options shared by exportable commands
#[derive(Args, Clone)]
pub struct ExportArgs {
    /// Export format; without it the result is printed as a table
    #[arg(long)]
    pub format: Option<ReportFormat>,
    /// Output file path
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    Csv,
    Json,
    Markdown,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum InterestTimingArg {
    Anticipated,
    Due,
}

impl InterestTimingArg {
    pub fn to_core_type(self) -> lendbook_core::InterestTiming {
        match self {
            InterestTimingArg::Anticipated => lendbook_core::InterestTiming::Anticipated,
            InterestTimingArg::Due => lendbook_core::InterestTiming::Due,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MethodArg {
    Cash,
    Transfer,
    Deposit,
    Cheque,
    Other,
}

impl MethodArg {
    pub fn to_core_type(self) -> lendbook_core::PaymentMethod {
        match self {
            MethodArg::Cash => lendbook_core::PaymentMethod::Cash,
            MethodArg::Transfer => lendbook_core::PaymentMethod::Transfer,
            MethodArg::Deposit => lendbook_core::PaymentMethod::Deposit,
            MethodArg::Cheque => lendbook_core::PaymentMethod::Cheque,
            MethodArg::Other => lendbook_core::PaymentMethod::Other,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StandingArg {
    Active,
    Paid,
    Overdue,
    Delinquent,
    Cancelled,
}

impl StandingArg {
    pub fn to_core_type(self) -> lendbook_core::LoanStanding {
        match self {
            StandingArg::Active => lendbook_core::LoanStanding::Active,
            StandingArg::Paid => lendbook_core::LoanStanding::Paid,
            StandingArg::Overdue => lendbook_core::LoanStanding::Overdue,
            StandingArg::Delinquent => lendbook_core::LoanStanding::Delinquent,
            StandingArg::Cancelled => lendbook_core::LoanStanding::Cancelled,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Init { force } => {
            db::init_database(&cli, *force).await?;
            println!("✅ Database initialized at {:?}", cli.db);
        }

        Commands::Status => {
            db::show_status(&cli).await?;
        }

        Commands::Lender { action } => {
            let ledger = db::open(&cli).await?;
            lender::handle(&ledger, &cli.actor, action).await?;
        }

        Commands::Client { action } => {
            let ledger = db::open(&cli).await?;
            client::handle(&ledger, &cli.actor, action).await?;
        }

        Commands::Codebtor { action } => {
            let ledger = db::open(&cli).await?;
            client::handle_codebtor(&ledger, &cli.actor, action).await?;
        }

        Commands::Loan { action } => {
            let ledger = db::open(&cli).await?;
            loan::handle(&ledger, &cli.actor, action).await?;
        }

        Commands::Payment { action } => {
            let ledger = db::open(&cli).await?;
            payment::handle(&ledger, &cli.actor, action).await?;
        }

        Commands::Report { action } => {
            let ledger = db::open(&cli).await?;
            report::handle(&ledger, action).await?;
        }

        Commands::Audit {
            from,
            to,
            entity,
            by,
            types,
            export,
        } => {
            audit::run_audit(&cli.events_dir, *from, *to, entity.as_deref(), by.as_deref(), types.as_deref(), export)?;
        }
    }

    Ok(())
}
