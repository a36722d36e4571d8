use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::{Transaction, TransactionType};
use crate::utils::checked_add;

/// Net weight held: buys minus sells, never below zero
pub fn compute_holdings(transactions: &[Transaction]) -> Result<Decimal> {
    let net = transactions.iter().try_fold(Decimal::ZERO, |acc, tx| {
        checked_add(acc, tx.signed_weight(), "net holdings")
    })?;
    Ok(net.max(Decimal::ZERO))
}

/// Ledger totals behind the holdings figure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingsSummary {
    pub total_bought_grams: Decimal,
    pub total_sold_grams: Decimal,
    pub net_grams: Decimal,
    pub total_spent: Decimal,
    pub total_received: Decimal,
    pub transaction_count: usize,
}

impl HoldingsSummary {
    pub fn from_transactions(transactions: &[Transaction]) -> Result<Self> {
        let mut summary = Self {
            total_bought_grams: Decimal::ZERO,
            total_sold_grams: Decimal::ZERO,
            net_grams: compute_holdings(transactions)?,
            total_spent: Decimal::ZERO,
            total_received: Decimal::ZERO,
            transaction_count: transactions.len(),
        };

        for tx in transactions {
            match tx.transaction_type {
                TransactionType::Buy => {
                    summary.total_bought_grams =
                        checked_add(summary.total_bought_grams, tx.weight_grams, "grams bought")?;
                    summary.total_spent =
                        checked_add(summary.total_spent, tx.total_price, "total spent")?;
                }
                TransactionType::Sell => {
                    summary.total_sold_grams =
                        checked_add(summary.total_sold_grams, tx.weight_grams, "grams sold")?;
                    summary.total_received =
                        checked_add(summary.total_received, tx.total_price, "total received")?;
                }
            }
        }

        Ok(summary)
    }
}

/// Holdings of a user straight from the ledger
pub fn calculate_holdings(conn: &Connection, user_id: i64) -> Result<HoldingsSummary> {
    let transactions = crate::db::list_transactions(conn, user_id)?;
    HoldingsSummary::from_transactions(&transactions)
}
