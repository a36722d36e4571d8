//! Hawl (holding period) tracking
//!
//! Zakat only falls due on gold held continuously at or above nisab for one
//! lunar year. This module replays a ledger to find where the current
//! continuous run began and measures how long it has lasted.

use anyhow::Result;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

use crate::db::Transaction;
use crate::utils::checked_add;

/// Date of the transaction that started the current continuous run at or
/// above `threshold`.
///
/// The ledger is replayed in date order (ties broken by id). Any point where
/// the running total drops below the threshold ends the run, so a later
/// crossing starts a new one. Returns `None` when the ledger does not end at
/// or above the threshold.
pub fn current_run_start(
    transactions: &[Transaction],
    threshold: Decimal,
) -> Result<Option<NaiveDate>> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by_key(|tx| (tx.transaction_date, tx.id));

    let mut running = Decimal::ZERO;
    let mut run_start = None;

    for tx in ordered {
        running = checked_add(running, tx.signed_weight(), "running holdings")?;
        if running < threshold {
            run_start = None;
        } else if run_start.is_none() {
            run_start = Some(tx.transaction_date);
        }
    }

    Ok(run_start)
}

/// Whole days elapsed from `start` to `today` (negative if `start` is in the future)
pub fn days_held(start: NaiveDate, today: NaiveDate) -> i64 {
    (today - start).num_days()
}

/// `start` moved forward by `days`, saturating at the calendar maximum
pub fn add_days(start: NaiveDate, days: u64) -> NaiveDate {
    start
        .checked_add_days(Days::new(days))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TransactionType;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    const NISAB: Decimal = Decimal::from_parts(85, 0, 0, false, 0);

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(id: i64, kind: TransactionType, weight: Decimal, on: NaiveDate) -> Transaction {
        let now = Utc::now();
        Transaction {
            id,
            user_id: 1,
            transaction_type: kind,
            weight_grams: weight,
            price_per_gram: dec!(60),
            total_price: weight * dec!(60),
            transaction_date: on,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_run_starts_at_crossing_transaction() {
        let ledger = vec![
            tx(1, TransactionType::Buy, dec!(50), date(2024, 1, 1)),
            tx(2, TransactionType::Buy, dec!(35), date(2024, 3, 1)),
            tx(3, TransactionType::Buy, dec!(10), date(2024, 6, 1)),
        ];
        assert_eq!(current_run_start(&ledger, NISAB).unwrap(), Some(date(2024, 3, 1)));
    }

    #[test]
    fn test_replay_sorts_by_date() {
        let ledger = vec![
            tx(2, TransactionType::Buy, dec!(60), date(2024, 5, 1)),
            tx(1, TransactionType::Buy, dec!(30), date(2024, 1, 1)),
        ];
        assert_eq!(current_run_start(&ledger, NISAB).unwrap(), Some(date(2024, 5, 1)));
    }

    #[test]
    fn test_dip_below_threshold_restarts_run() {
        let ledger = vec![
            tx(1, TransactionType::Buy, dec!(100), date(2023, 1, 1)),
            tx(2, TransactionType::Sell, dec!(50), date(2023, 6, 1)),
            tx(3, TransactionType::Buy, dec!(60), date(2024, 2, 1)),
        ];
        assert_eq!(current_run_start(&ledger, NISAB).unwrap(), Some(date(2024, 2, 1)));
    }

    #[test]
    fn test_sell_that_stays_above_keeps_run() {
        let ledger = vec![
            tx(1, TransactionType::Buy, dec!(120), date(2023, 1, 1)),
            tx(2, TransactionType::Sell, dec!(35), date(2023, 6, 1)),
        ];
        assert_eq!(current_run_start(&ledger, NISAB).unwrap(), Some(date(2023, 1, 1)));
    }

    #[test]
    fn test_below_threshold_has_no_run() {
        let ledger = vec![tx(1, TransactionType::Buy, dec!(84), date(2023, 1, 1))];
        assert_eq!(current_run_start(&ledger, NISAB).unwrap(), None);
        assert_eq!(current_run_start(&[], NISAB).unwrap(), None);
    }

    #[test]
    fn test_days_held_and_add_days() {
        assert_eq!(days_held(date(2024, 1, 1), date(2024, 12, 20)), 354);
        assert_eq!(days_held(date(2024, 1, 2), date(2024, 1, 1)), -1);
        assert_eq!(add_days(date(2024, 1, 1), 708), date(2025, 12, 9));
        assert_eq!(add_days(NaiveDate::MAX, 1), NaiveDate::MAX);
    }
}
