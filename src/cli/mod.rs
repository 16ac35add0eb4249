pub mod backup;
pub mod catalog;
pub mod init;
pub mod load;
pub mod pending;
pub mod portfolio;
pub mod settlement;
pub mod status;
pub mod sync;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{get_connection, init_db, DB_FILE};
use crate::error::{CobranzaError, Result};
use crate::settings::get_data_dir;

/// Open the configured database, bringing its schema up to date.
pub(crate) fn open_db() -> Result<Connection> {
    let db_path = get_data_dir().join(DB_FILE);
    if !db_path.exists() {
        return Err(CobranzaError::Settings(format!(
            "No database found at {}\nRun `cobranza init` to set up.",
            db_path.display()
        )));
    }
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    Ok(conn)
}

#[derive(Parser)]
#[command(name = "cobranza", about = "Offline collections toolkit for microcredit field agents.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up cobranza: choose a data directory and initialize the database.
    Init {
        /// Path for cobranza data (default: ~/Documents/cobranza)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Field agent name stamped on exported batches
        #[arg(long)]
        agent: Option<String>,
    },
    /// Switch to an existing cobranza data directory.
    Load {
        /// Path to data directory containing cobranza.db
        path: String,
    },
    /// Show current database and summary statistics.
    Status,
    /// Back up the database.
    Backup {
        /// Output path (default: <data_dir>/backups/cobranza-YYYYMMDD-HHMMSS.db)
        #[arg(long)]
        output: Option<String>,
    },
    /// Work with the assigned credit portfolio.
    Portfolio {
        #[command(subcommand)]
        command: PortfolioCommands,
    },
    /// Stage, review and remove payments awaiting confirmation.
    Pending {
        #[command(subcommand)]
        command: PendingCommands,
    },
    /// Daily settlement summary of captured payments.
    Settlement {
        /// Day to summarize: YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Hand staged payments to the server and clear confirmed ones.
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Manage the payment-type catalog.
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum PortfolioCommands {
    /// Replace the cached portfolio with an API export (JSON or CSV).
    Import {
        /// Path to the exported portfolio file
        file: String,
        /// File format: json, csv (default: from extension)
        #[arg(long)]
        format: Option<String>,
    },
    /// List the portfolio grouped by payment day.
    List {
        /// Filter by client name or credit number (3+ characters)
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one credit with its staged payments.
    Show {
        /// Credit number
        credit: String,
    },
}

#[derive(Subcommand)]
pub enum PendingCommands {
    /// Stage a payment captured in the field.
    Add {
        /// Credit number the payment applies to
        #[arg(long)]
        credit: String,
        /// Amount received
        #[arg(long)]
        amount: f64,
        /// Payment type code (see `cobranza catalog list`)
        #[arg(long = "type", default_value = "PAGO")]
        payment_type: String,
        /// Loan cycle (default: from the cached portfolio)
        #[arg(long)]
        cycle: Option<String>,
        /// Client name (default: from the cached portfolio)
        #[arg(long)]
        client: Option<String>,
        /// GPS latitude of the visit
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,
        /// GPS longitude of the visit
        #[arg(long, allow_negative_numbers = true)]
        lon: Option<f64>,
        /// Reference to the evidence photo
        #[arg(long)]
        photo: Option<String>,
    },
    /// List staged payments.
    List {
        /// Only payments for this credit number
        #[arg(long)]
        credit: Option<String>,
    },
    /// Remove a staged payment by ID.
    Delete {
        /// Payment ID (shown in `cobranza pending list`)
        id: String,
    },
    /// Remove every staged payment.
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Total staged for one credit.
    Total {
        /// Credit number
        credit: String,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Write all staged payments to a batch file for submission.
    Export {
        /// Output path (default: <data_dir>/exports/lote-YYYYMMDD-HHMMSS.json)
        #[arg(long)]
        output: Option<String>,
    },
    /// Remove the payments of a batch the server accepted.
    Ack {
        /// Batch file produced by `cobranza sync export`
        file: String,
    },
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// List payment types.
    List {
        /// Include deactivated types
        #[arg(long)]
        all: bool,
    },
    /// Add or update a payment type.
    Add {
        /// Type code, e.g. ABONO
        code: String,
        /// Human-readable description
        description: String,
    },
    /// Deactivate a payment type.
    Disable {
        /// Type code
        code: String,
    },
}
