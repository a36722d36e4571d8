use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use super::goals::{evaluate_goals, GoalProgress};
use super::holdings::compute_holdings;
use crate::db;
use crate::pricing::{PriceQuote, PriceService};
use crate::utils::{checked_mul, round_money};
use crate::zakat::{self, ZakatStatus};

/// Everything the dashboard shows, taken at one point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub total_gold_grams: Decimal,
    pub estimated_total_value: Decimal,
    pub current_gold_price: PriceQuote,
    pub goals_progress: Vec<GoalProgress>,
    pub zakat_status: ZakatStatus,
}

/// Compose the dashboard from one read of the store and one price quote.
///
/// The ledger, goals and zakat record are read inside a single deferred
/// transaction so all three reflect the same database state. Nothing is
/// written.
pub fn build_dashboard(
    conn: &mut Connection,
    user_id: i64,
    quote: PriceQuote,
    today: NaiveDate,
) -> Result<Dashboard> {
    let snapshot = conn.transaction()?;
    let transactions = db::list_transactions(&snapshot, user_id)?;
    let goals = db::list_goals(&snapshot, user_id)?;
    let prior = db::get_zakat_record(&snapshot, user_id)?;
    snapshot.finish()?;

    let holdings = compute_holdings(&transactions)?;
    let zakat_state = zakat::evaluate(&transactions, prior.as_ref(), today)?;
    let price = quote.price_per_gram_usd;
    let estimated_total_value = round_money(checked_mul(holdings, price, "holdings value")?);

    Ok(Dashboard {
        total_gold_grams: holdings,
        estimated_total_value,
        current_gold_price: quote,
        goals_progress: evaluate_goals(&goals, holdings),
        zakat_status: ZakatStatus::from_state(&zakat_state, today, Some(price))?,
    })
}

/// Fetch the price (cached when fresh) and build the dashboard
pub async fn aggregate(
    conn: &mut Connection,
    prices: &PriceService,
    user_id: i64,
    today: NaiveDate,
) -> Result<Dashboard> {
    let quote = prices.current().await?;
    build_dashboard(conn, user_id, quote, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewGoal, NewTransaction, TransactionType};
    use crate::pricing::{FixedPriceFeed, PriceCache};
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_db() -> (TempDir, Connection) {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        db::init_database(Some(db_path.clone())).unwrap();
        let conn = db::open_db(Some(db_path)).unwrap();
        (temp_dir, conn)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 16).unwrap()
    }

    #[tokio::test]
    async fn test_aggregate_combines_all_components() {
        let (_dir, mut conn) = create_test_db();
        let now = Utc::now();
        for (kind, weight, days) in [
            (TransactionType::Buy, dec!(120), 400),
            (TransactionType::Sell, dec!(20), 100),
        ] {
            let tx = NewTransaction::new(
                1,
                kind,
                weight,
                dec!(55),
                today() - Duration::days(days),
                None,
            )
            .unwrap();
            db::insert_transaction(&conn, &tx, now).unwrap();
        }
        db::insert_goal(
            &conn,
            &NewGoal::new(1, "Savings", dec!(200), today() + Duration::days(90), None).unwrap(),
            now,
        )
        .unwrap();

        let prices = PriceService::new(
            Arc::new(PriceCache::new()),
            Arc::new(FixedPriceFeed::new(dec!(60))),
        );
        let dashboard = aggregate(&mut conn, &prices, 1, today()).await.unwrap();

        assert_eq!(dashboard.total_gold_grams, dec!(100));
        assert_eq!(dashboard.current_gold_price.price_per_gram_usd, dec!(60));
        assert_eq!(dashboard.estimated_total_value, dec!(6000));
        assert_eq!(dashboard.goals_progress.len(), 1);
        assert_eq!(dashboard.goals_progress[0].progress_percentage, dec!(50));
        assert!(dashboard.zakat_status.is_eligible);
        assert_eq!(dashboard.zakat_status.zakat_due, Some(dec!(150)));

        // Read-only: no zakat record was written
        assert!(db::get_zakat_record(&conn, 1).unwrap().is_none());
    }

    #[test]
    fn test_empty_user_dashboard() {
        let (_dir, mut conn) = create_test_db();
        let quote = PriceQuote::new(dec!(60), Utc::now()).unwrap();
        let dashboard = build_dashboard(&mut conn, 42, quote, today()).unwrap();

        assert_eq!(dashboard.total_gold_grams, Decimal::ZERO);
        assert_eq!(dashboard.estimated_total_value, Decimal::ZERO);
        assert!(dashboard.goals_progress.is_empty());
        assert!(!dashboard.zakat_status.is_eligible);
        assert!(!dashboard.zakat_status.meets_nisab);
    }

    #[test]
    fn test_value_beyond_decimal_range_is_an_error() {
        let (_dir, mut conn) = create_test_db();
        let tx = NewTransaction::new(
            1,
            TransactionType::Buy,
            dec!(10000000000000000000000000),
            dec!(1),
            today(),
            None,
        )
        .unwrap();
        db::insert_transaction(&conn, &tx, Utc::now()).unwrap();

        let quote = PriceQuote::new(dec!(1000000), Utc::now()).unwrap();
        let err = build_dashboard(&mut conn, 1, quote, today()).unwrap_err();
        assert!(matches!(
            crate::error::TrackerError::kind_of(&err),
            Some(crate::error::TrackerError::Validation(_))
        ));
    }
}
