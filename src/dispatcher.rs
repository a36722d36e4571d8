//! Command dispatcher that routes parsed clap commands to their handlers.
//!
//! Every handler gets an [`AppContext`] carrying the resolved configuration,
//! the active user and the output mode, and opens its own connection.

mod dashboard;
mod goals;
mod prices;
mod transactions;
mod zakat;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use goldtrack::config::Config;
use goldtrack::db;
use goldtrack::error::TrackerError;
use goldtrack::pricing::PriceService;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cli::{Cli, Commands};

pub struct AppContext {
    pub config: Config,
    pub user_id: i64,
    pub json_output: bool,
}

impl AppContext {
    /// Resolve the effective settings; CLI flags win over config and env
    pub fn from_cli(cli: &Cli, mut config: Config) -> Self {
        if let Some(ref path) = cli.db {
            config.database_path = Some(path.clone());
        }
        let user_id = cli.user.unwrap_or(config.user_id);
        Self {
            config,
            user_id,
            json_output: cli.json,
        }
    }

    pub fn db_path(&self) -> Option<PathBuf> {
        self.config.database_path.clone()
    }

    /// Initialize (if needed) and open the database
    pub fn open_db(&self) -> Result<Connection> {
        db::init_database(self.db_path())?;
        db::open_db(self.db_path())
    }

    pub fn price_service(&self) -> Result<PriceService> {
        self.config.price_service()
    }

    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Route a parsed command to its handler
pub async fn dispatch_command(command: &Commands, ctx: &AppContext) -> Result<()> {
    match command {
        Commands::Tx { action } => transactions::dispatch_transactions(action, ctx).await,
        Commands::Holdings => transactions::dispatch_holdings(ctx).await,
        Commands::Goals { action } => goals::dispatch_goals(action, ctx).await,
        Commands::Zakat { action } => zakat::dispatch_zakat(action, ctx).await,
        Commands::Price { fresh, refresh } => prices::dispatch_price(*fresh, *refresh, ctx).await,
        Commands::Dashboard => dashboard::dispatch_dashboard(ctx).await,
    }
}

pub(crate) fn parse_decimal(label: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value.trim()).map_err(|_| {
        TrackerError::Validation(format!(
            "Invalid {}: {:?}. Must be a decimal number",
            label, value
        ))
        .into()
    })
}

pub(crate) fn parse_date(label: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        TrackerError::Validation(format!(
            "Invalid {}: {:?}. Use YYYY-MM-DD",
            label, value
        ))
        .into()
    })
}
