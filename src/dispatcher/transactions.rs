use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use goldtrack::db::{self, NewTransaction, TransactionType, TransactionUpdate};
use goldtrack::error::TrackerError;
use goldtrack::reports;
use goldtrack::zakat;
use rusqlite::Connection;
use tracing::{debug, info};

use super::{parse_date, parse_decimal, AppContext};
use crate::cli::formatters;
use crate::cli::TransactionCommands;

pub async fn dispatch_transactions(action: &TransactionCommands, ctx: &AppContext) -> Result<()> {
    match action {
        TransactionCommands::Add {
            transaction_type,
            weight,
            price,
            date,
            description,
        } => {
            dispatch_transaction_add(
                transaction_type,
                weight,
                price,
                date.as_deref(),
                description.as_deref(),
                ctx,
            )
            .await
        }
        TransactionCommands::List => dispatch_transactions_list(ctx).await,
        TransactionCommands::Update {
            id,
            weight,
            price,
            date,
            description,
        } => {
            let update = TransactionUpdate {
                weight_grams: weight
                    .as_deref()
                    .map(|w| parse_decimal("weight", w))
                    .transpose()?,
                price_per_gram: price
                    .as_deref()
                    .map(|p| parse_decimal("price", p))
                    .transpose()?,
                transaction_date: date
                    .as_deref()
                    .map(|d| parse_date("date", d))
                    .transpose()?,
                description: description.clone(),
                ..TransactionUpdate::default()
            };
            dispatch_transaction_update(*id, &update, ctx).await
        }
        TransactionCommands::Delete { id } => dispatch_transaction_delete(*id, ctx).await,
    }
}

/// Apply a ledger change and refresh the stored zakat record in one write
fn with_zakat_refresh<T>(
    ctx: &AppContext,
    change: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    let mut conn = ctx.open_db()?;
    let (changed, record) =
        zakat::with_recalculation(&mut conn, ctx.user_id, ctx.today(), Utc::now(), change)?;
    debug!(
        "Zakat record {} refreshed: {} g, eligible={}",
        record.id, record.gold_weight_grams, record.is_eligible
    );
    Ok(changed)
}

async fn dispatch_transaction_add(
    transaction_type: &str,
    weight_str: &str,
    price_str: &str,
    date_str: Option<&str>,
    description: Option<&str>,
    ctx: &AppContext,
) -> Result<()> {
    let tx_type: TransactionType = transaction_type.parse().map_err(|_| {
        TrackerError::Validation("Transaction type must be 'buy' or 'sell'".to_string())
    })?;
    let weight = parse_decimal("weight", weight_str)?;
    let price = parse_decimal("price", price_str)?;
    let date = match date_str {
        Some(d) => parse_date("date", d)?,
        None => ctx.today(),
    };

    let new_tx = NewTransaction::new(
        ctx.user_id,
        tx_type,
        weight,
        price,
        date,
        description.map(str::to_string),
    )?;

    let tx = with_zakat_refresh(ctx, |conn| {
        db::insert_transaction(conn, &new_tx, Utc::now())
    })?;
    info!("Added transaction {} for user {}", tx.id, ctx.user_id);

    if ctx.json_output {
        println!("{}", formatters::format_json(&tx));
    } else {
        print!("{}", formatters::format_transaction_saved("added", &tx));
    }
    Ok(())
}

async fn dispatch_transactions_list(ctx: &AppContext) -> Result<()> {
    let conn = ctx.open_db()?;
    let transactions = db::list_transactions(&conn, ctx.user_id)?;

    if ctx.json_output {
        println!("{}", formatters::format_json(&transactions));
    } else {
        print!("{}", formatters::format_transactions_table(&transactions));
    }
    Ok(())
}

async fn dispatch_transaction_update(
    id: i64,
    update: &TransactionUpdate,
    ctx: &AppContext,
) -> Result<()> {
    let tx = with_zakat_refresh(ctx, |conn| {
        db::update_transaction(conn, ctx.user_id, id, update, Utc::now())
    })?;
    info!("Updated transaction {} for user {}", id, ctx.user_id);

    if ctx.json_output {
        println!("{}", formatters::format_json(&tx));
    } else {
        print!("{}", formatters::format_transaction_saved("updated", &tx));
    }
    Ok(())
}

async fn dispatch_transaction_delete(id: i64, ctx: &AppContext) -> Result<()> {
    with_zakat_refresh(ctx, |conn| db::delete_transaction(conn, ctx.user_id, id))?;
    info!("Deleted transaction {} for user {}", id, ctx.user_id);

    if ctx.json_output {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("{} Transaction {} deleted", "✓".green().bold(), id);
    }
    Ok(())
}

pub async fn dispatch_holdings(ctx: &AppContext) -> Result<()> {
    let conn = ctx.open_db()?;
    let summary = reports::calculate_holdings(&conn, ctx.user_id)?;

    if ctx.json_output {
        println!("{}", formatters::format_json(&summary));
    } else {
        print!("{}", formatters::format_holdings(&summary));
    }
    Ok(())
}
