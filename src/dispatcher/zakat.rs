use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use goldtrack::db::ZakatState;
use goldtrack::error::TrackerError;
use goldtrack::utils::format_currency;
use goldtrack::zakat::{self, ZakatStatus};
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::{parse_date, parse_decimal, AppContext};
use crate::cli::formatters;
use crate::cli::ZakatCommands;

pub async fn dispatch_zakat(action: &ZakatCommands, ctx: &AppContext) -> Result<()> {
    match action {
        ZakatCommands::Status => dispatch_zakat_status(ctx).await,
        ZakatCommands::Recalc => dispatch_zakat_recalc(ctx).await,
        ZakatCommands::Amount { price } => dispatch_zakat_amount(price.as_deref(), ctx).await,
        ZakatCommands::Reminders => dispatch_zakat_reminders(ctx).await,
        ZakatCommands::Advance { record_id, date } => {
            let new_date = parse_date("date", date)?;
            let conn = ctx.open_db()?;
            let record = zakat::advance_reminder(&conn, *record_id, new_date, Utc::now())?;

            if ctx.json_output {
                println!("{}", formatters::format_json(&record));
            } else {
                println!(
                    "{} Reminder for record {} moved to {}",
                    "✓".green().bold(),
                    record.id,
                    new_date.format("%Y-%m-%d")
                );
            }
            Ok(())
        }
    }
}

/// Spot price when a price source is configured; None when there is none
async fn optional_spot_price(ctx: &AppContext) -> Result<Option<Decimal>> {
    let service = match ctx.price_service() {
        Ok(service) => service,
        Err(e) if matches!(TrackerError::kind_of(&e), Some(TrackerError::Config(_))) => {
            debug!("No price source configured: {}", e);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    let quote = service.current().await?;
    Ok(Some(quote.price_per_gram_usd))
}

async fn dispatch_zakat_status(ctx: &AppContext) -> Result<()> {
    let price = optional_spot_price(ctx).await?;
    let conn = ctx.open_db()?;
    let status = zakat::current_status(&conn, ctx.user_id, ctx.today(), price)?;
    print_status(&status, ctx);
    Ok(())
}

async fn dispatch_zakat_recalc(ctx: &AppContext) -> Result<()> {
    let mut conn = ctx.open_db()?;
    let today = ctx.today();
    let record = zakat::recalculate(&mut conn, ctx.user_id, today, Utc::now())?;
    info!("Recalculated zakat record {} for user {}", record.id, ctx.user_id);

    if ctx.json_output {
        println!("{}", formatters::format_json(&record));
    } else {
        let state = ZakatState::from(&record);
        print_status(&ZakatStatus::from_state(&state, today, None)?, ctx);
    }
    Ok(())
}

async fn dispatch_zakat_amount(price: Option<&str>, ctx: &AppContext) -> Result<()> {
    let price = match price {
        Some(p) => parse_decimal("price", p)?,
        None => ctx.price_service()?.current().await?.price_per_gram_usd,
    };

    let conn = ctx.open_db()?;
    let amount = zakat::calculate_zakat_amount(&conn, ctx.user_id, price)?;

    if ctx.json_output {
        println!(
            "{}",
            serde_json::json!({
                "user_id": ctx.user_id,
                "price_per_gram": price,
                "zakat_amount": amount,
            })
        );
    } else {
        println!(
            "{:<20} {}\n{:<20} {}",
            "Price per gram:",
            format_currency(price),
            "Zakat due:".bold(),
            format_currency(amount).green().bold()
        );
    }
    Ok(())
}

async fn dispatch_zakat_reminders(ctx: &AppContext) -> Result<()> {
    let conn = ctx.open_db()?;
    let due = zakat::users_due_for_reminder(&conn, ctx.today())?;

    if ctx.json_output {
        println!("{}", formatters::format_json(&due));
    } else {
        print!("{}", formatters::format_reminders_table(&due));
    }
    Ok(())
}

fn print_status(status: &ZakatStatus, ctx: &AppContext) {
    if ctx.json_output {
        println!("{}", formatters::format_json(status));
    } else {
        print!("{}", formatters::format_zakat_status(status));
    }
}
