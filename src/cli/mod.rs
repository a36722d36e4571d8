use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod formatters;

#[derive(Parser)]
#[command(name = "goldtrack")]
#[command(version, about = "Gold holdings tracker with savings goals and zakat")]
#[command(
    long_about = "Record gold purchases and sales, follow progress towards savings goals, and track zakat eligibility (85 g nisab held for one lunar year) with live spot prices."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// User whose records to work on (defaults to user_id from the config file)
    #[arg(long, global = true)]
    pub user: Option<i64>,

    /// Path to the SQLite database (overrides config and GOLDTRACK_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record and manage gold purchases and sales
    Tx {
        #[command(subcommand)]
        action: TransactionCommands,
    },

    /// Show current gold holdings
    Holdings,

    /// Savings goals
    Goals {
        #[command(subcommand)]
        action: GoalCommands,
    },

    /// Zakat eligibility, amount and reminders
    Zakat {
        #[command(subcommand)]
        action: ZakatCommands,
    },

    /// Show the gold spot price per gram
    Price {
        /// Bypass the cache without storing the result
        #[arg(long, conflicts_with = "refresh")]
        fresh: bool,

        /// Fetch a new quote and store it in the cache
        #[arg(long)]
        refresh: bool,
    },

    /// Holdings, value, goals and zakat in one view
    Dashboard,
}

#[derive(Subcommand)]
pub enum TransactionCommands {
    /// Add a buy or sell transaction
    Add {
        /// Transaction type: buy or sell
        transaction_type: String,

        /// Weight in grams (e.g., 10.5)
        weight: String,

        /// Price per gram in USD (e.g., 65.75)
        price: String,

        /// Transaction date (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// Free-form note
        #[arg(long)]
        description: Option<String>,
    },

    /// List all transactions
    List,

    /// Change fields of an existing transaction
    Update {
        /// Transaction ID
        id: i64,

        /// New weight in grams
        #[arg(long)]
        weight: Option<String>,

        /// New price per gram
        #[arg(long)]
        price: Option<String>,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// New note
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a transaction
    Delete {
        /// Transaction ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum GoalCommands {
    /// Add a savings goal
    Add {
        /// Goal title
        title: String,

        /// Target weight in grams
        target: String,

        /// Deadline (YYYY-MM-DD)
        deadline: String,

        /// Free-form description
        #[arg(long)]
        description: Option<String>,
    },

    /// List goals with progress
    List,

    /// Change fields of an existing goal
    Update {
        /// Goal ID
        id: i64,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New target weight in grams
        #[arg(long)]
        target: Option<String>,

        /// New deadline (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,
    },

    /// Mark a goal as completed
    Complete {
        /// Goal ID
        id: i64,
    },

    /// Delete a goal
    Delete {
        /// Goal ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ZakatCommands {
    /// Show eligibility as of today (does not save)
    Status,

    /// Recalculate and save the zakat record
    Recalc,

    /// Zakat owed according to the saved record
    Amount {
        /// Price per gram to use instead of the spot price
        #[arg(long)]
        price: Option<String>,
    },

    /// List records whose reminder date has arrived
    Reminders,

    /// Move a record's next reminder date
    Advance {
        /// Zakat record ID
        record_id: i64,

        /// New reminder date (YYYY-MM-DD)
        date: String,
    },
}
