//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of data calculation from presentation.

use chrono::NaiveDate;
use colored::Colorize;
use goldtrack::db::{Transaction, TransactionType, ZakatRecord};
use goldtrack::pricing::PriceQuote;
use goldtrack::reports::{Dashboard, GoalProgress, HoldingsSummary};
use goldtrack::utils::{format_currency, format_grams};
use goldtrack::zakat::ZakatStatus;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

/// Pretty JSON for any report type
pub fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn yes_no(value: bool) -> String {
    if value {
        "yes".green().to_string()
    } else {
        "no".yellow().to_string()
    }
}

pub fn format_transactions_table(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return format!(
            "{} No transactions found\nAdd one with: {} tx add buy <grams> <price>\n",
            "ℹ".blue().bold(),
            "goldtrack".bold()
        );
    }

    #[derive(Tabled)]
    struct TransactionRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Type")]
        tx_type: String,
        #[tabled(rename = "Weight")]
        weight: String,
        #[tabled(rename = "Price/g")]
        price: String,
        #[tabled(rename = "Total")]
        total: String,
        #[tabled(rename = "Description")]
        description: String,
    }

    let rows: Vec<TransactionRow> = transactions
        .iter()
        .map(|tx| TransactionRow {
            id: tx.id,
            date: tx.transaction_date.format("%Y-%m-%d").to_string(),
            tx_type: match tx.transaction_type {
                TransactionType::Buy => "BUY".green().to_string(),
                TransactionType::Sell => "SELL".red().to_string(),
            },
            weight: format_grams(tx.weight_grams),
            price: format_currency(tx.price_per_gram),
            total: format_currency(tx.total_price),
            description: tx.description.clone().unwrap_or_default(),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(3..6), Alignment::right());
    format!("{}\n", table)
}

pub fn format_transaction_saved(action: &str, tx: &Transaction) -> String {
    format!(
        "{} Transaction {} {}: {} {} at {}/g = {} on {}\n",
        "✓".green().bold(),
        tx.id,
        action,
        tx.transaction_type.as_str(),
        format_grams(tx.weight_grams),
        format_currency(tx.price_per_gram),
        format_currency(tx.total_price),
        tx.transaction_date.format("%Y-%m-%d")
    )
}

pub fn format_holdings(summary: &HoldingsSummary) -> String {
    let mut output = format!("\n{} Gold Holdings\n\n", "🪙".yellow().bold());
    output.push_str(&format!(
        "{:<20} {}\n",
        "Net holdings:".bold(),
        format_grams(summary.net_grams).cyan().bold()
    ));
    output.push_str(&format!(
        "{:<20} {} ({})\n",
        "Bought:",
        format_grams(summary.total_bought_grams),
        format_currency(summary.total_spent)
    ));
    output.push_str(&format!(
        "{:<20} {} ({})\n",
        "Sold:",
        format_grams(summary.total_sold_grams),
        format_currency(summary.total_received)
    ));
    output.push_str(&format!(
        "{:<20} {}\n",
        "Transactions:", summary.transaction_count
    ));
    output
}

pub fn format_goals_table(goals: &[GoalProgress]) -> String {
    if goals.is_empty() {
        return format!("{} No goals found\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct GoalRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Target")]
        target: String,
        #[tabled(rename = "Progress")]
        progress: String,
        #[tabled(rename = "Deadline")]
        deadline: String,
        #[tabled(rename = "Done")]
        completed: String,
    }

    let rows: Vec<GoalRow> = goals
        .iter()
        .map(|g| GoalRow {
            id: g.id,
            title: g.title.clone(),
            target: format_grams(g.target_weight_grams),
            progress: format!("{:.2}%", g.progress_percentage),
            deadline: g.deadline.format("%Y-%m-%d").to_string(),
            completed: yes_no(g.is_completed),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(2..4), Alignment::right());
    format!("{}\n", table)
}

pub fn format_zakat_status(status: &ZakatStatus) -> String {
    let mut output = format!("\n{} Zakat Status\n\n", "☪".cyan().bold());
    output.push_str(&format!(
        "{:<22} {} (nisab {})\n",
        "Gold held:".bold(),
        format_grams(status.gold_weight_grams),
        format_grams(status.nisab_grams)
    ));
    output.push_str(&format!(
        "{:<22} {}\n",
        "Meets nisab:",
        yes_no(status.meets_nisab)
    ));
    output.push_str(&format!(
        "{:<22} {}\n",
        "Holding since:",
        format_date(status.holding_start_date)
    ));
    if let Some(days) = status.days_held {
        output.push_str(&format!("{:<22} {}\n", "Days held:", days));
    }
    if let Some(days) = status.days_until_eligible.filter(|d| *d > 0) {
        output.push_str(&format!("{:<22} {}\n", "Days until eligible:", days));
    }
    output.push_str(&format!(
        "{:<22} {}\n",
        "Eligible:",
        yes_no(status.is_eligible)
    ));
    output.push_str(&format!(
        "{:<22} {}\n",
        "Next reminder:",
        format_date(status.next_reminder_date)
    ));
    if let Some(due) = status.zakat_due {
        output.push_str(&format!(
            "{:<22} {}\n",
            "Zakat due:".bold(),
            format_currency(due).green().bold()
        ));
    }
    output
}

pub fn format_reminders_table(records: &[ZakatRecord]) -> String {
    if records.is_empty() {
        return format!("{} No zakat reminders due\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct ReminderRow {
        #[tabled(rename = "Record")]
        id: i64,
        #[tabled(rename = "User")]
        user_id: i64,
        #[tabled(rename = "Gold")]
        weight: String,
        #[tabled(rename = "Holding Since")]
        start: String,
        #[tabled(rename = "Reminder")]
        reminder: String,
    }

    let rows: Vec<ReminderRow> = records
        .iter()
        .map(|r| ReminderRow {
            id: r.id,
            user_id: r.user_id,
            weight: format_grams(r.gold_weight_grams),
            start: format_date(r.holding_start_date),
            reminder: format_date(r.next_reminder_date),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(2..3), Alignment::right());
    format!("{}\n", table)
}

pub fn format_price(quote: &PriceQuote) -> String {
    format!(
        "{} Gold spot: {} per gram (as of {})\n",
        "💰".yellow().bold(),
        format_currency(quote.price_per_gram_usd).bold(),
        quote.timestamp.format("%Y-%m-%d %H:%M UTC")
    )
}

pub fn format_dashboard(dashboard: &Dashboard) -> String {
    let mut output = format!("\n{} Dashboard\n\n", "📊".cyan().bold());
    output.push_str(&format!(
        "{:<20} {}\n",
        "Gold held:".bold(),
        format_grams(dashboard.total_gold_grams).cyan().bold()
    ));
    output.push_str(&format!(
        "{:<20} {}/g (as of {})\n",
        "Spot price:",
        format_currency(dashboard.current_gold_price.price_per_gram_usd),
        dashboard
            .current_gold_price
            .timestamp
            .format("%Y-%m-%d %H:%M UTC")
    ));
    output.push_str(&format!(
        "{:<20} {}\n",
        "Estimated value:".bold(),
        format_currency(dashboard.estimated_total_value).green().bold()
    ));

    output.push_str(&format!("\n{}\n", "Goals".bold()));
    output.push_str(&format_goals_table(&dashboard.goals_progress));
    output.push_str(&format_zakat_status(&dashboard.zakat_status));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sample_transaction() -> Transaction {
        let now = Utc::now();
        Transaction {
            id: 7,
            user_id: 1,
            transaction_type: TransactionType::Buy,
            weight_grams: dec!(10.5),
            price_per_gram: dec!(65.75),
            total_price: dec!(690.38),
            transaction_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            description: Some("coins".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_transactions_message() {
        colored::control::set_override(false);
        let msg = format_transactions_table(&[]);
        assert!(msg.contains("No transactions found"));
        assert!(msg.contains("tx add"));
    }

    #[test]
    fn test_transactions_table_contains_values() {
        colored::control::set_override(false);
        let table = format_transactions_table(&[sample_transaction()]);
        assert!(table.contains("2025-01-15"));
        assert!(table.contains("10.500 g"));
        assert!(table.contains("$690.38"));
        assert!(table.contains("coins"));
    }

    #[test]
    fn test_saved_message() {
        colored::control::set_override(false);
        let msg = format_transaction_saved("added", &sample_transaction());
        assert!(msg.contains("Transaction 7 added"));
        assert!(msg.contains("BUY"));
        assert!(msg.contains("$65.75/g"));
    }

    #[test]
    fn test_zakat_status_shows_due_amount() {
        colored::control::set_override(false);
        let status = ZakatStatus {
            gold_weight_grams: dec!(100),
            nisab_grams: dec!(85),
            meets_nisab: true,
            holding_start_date: NaiveDate::from_ymd_opt(2024, 9, 26),
            days_held: Some(385),
            days_until_eligible: Some(0),
            is_eligible: true,
            next_reminder_date: NaiveDate::from_ymd_opt(2026, 9, 4),
            zakat_due: Some(dec!(150)),
        };
        let text = format_zakat_status(&status);
        assert!(text.contains("Eligible:"));
        assert!(text.contains("$150.00"));
        assert!(text.contains("2026-09-04"));
        assert!(!text.contains("Days until eligible"));
    }

    #[test]
    fn test_format_json_is_parseable() {
        let json = format_json(&sample_transaction());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["transaction_type"], "buy");
    }
}
