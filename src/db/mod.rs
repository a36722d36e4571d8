// Database module - SQLite connection, ledger and zakat persistence

pub mod models;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::TrackerError;
pub use models::{
    Goal, GoalUpdate, NewGoal, NewTransaction, Transaction, TransactionType, TransactionUpdate,
    ZakatRecord, ZakatState,
};

/// How long a writer waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Get the default database path (~/.goldtrack/data.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let app_dir = PathBuf::from(home).join(".goldtrack");

    std::fs::create_dir_all(&app_dir).context("Failed to create .goldtrack directory")?;

    Ok(app_dir.join("data.db"))
}

/// Open database connection
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };
    let conn = Connection::open(&path).context(format!("Failed to open database at {:?}", path))?;

    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("Failed to enable foreign keys")?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("Failed to set busy timeout")?;

    Ok(conn)
}

/// Start an IMMEDIATE transaction, taking the write lock up front.
///
/// A lock still held elsewhere after the busy timeout is reported as
/// `Conflict`.
pub fn begin_write(conn: &mut Connection) -> Result<rusqlite::Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
            {
                TrackerError::Conflict("database is locked by another writer".to_string()).into()
            }
            other => anyhow::Error::new(other),
        })
}

/// Initialize the database with schema
///
/// Creates the database file if needed and applies the schema. Safe to run
/// on every start: all statements are `IF NOT EXISTS`.
pub fn init_database(db_path: Option<PathBuf>) -> Result<()> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    info!("Initializing database at: {:?}", path);

    let conn = open_db(Some(path))?;
    conn.execute_batch(include_str!("schema.sql"))
        .context("Failed to execute schema")?;

    Ok(())
}

fn not_found(what: &str, id: i64) -> anyhow::Error {
    TrackerError::NotFound(format!("{} {}", what, id)).into()
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(TrackerError::Database(msg)),
    )
}

/// Helper to read Decimal from SQLite (handles INTEGER, REAL and TEXT)
pub fn get_decimal_value(row: &rusqlite::Row, idx: usize) -> Result<Decimal, rusqlite::Error> {
    use rusqlite::types::ValueRef;

    match row.get_ref(idx)? {
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Decimal::from_str(s).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        }
        ValueRef::Integer(i) => Ok(Decimal::from(i)),
        ValueRef::Real(f) => {
            Decimal::try_from(f).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        }
        _ => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "decimal".to_string(),
            rusqlite::types::Type::Null,
        )),
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

const TRANSACTION_COLUMNS: &str = "id, user_id, transaction_type, weight_grams, price_per_gram,
     total_price, transaction_date, description, created_at, updated_at";

fn transaction_from_row(row: &rusqlite::Row) -> Result<Transaction, rusqlite::Error> {
    let raw_type: String = row.get(2)?;
    let transaction_type = raw_type
        .parse::<TransactionType>()
        .map_err(|_| conversion_error(2, format!("unknown transaction type '{}'", raw_type)))?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        transaction_type,
        weight_grams: get_decimal_value(row, 3)?,
        price_per_gram: get_decimal_value(row, 4)?,
        total_price: get_decimal_value(row, 5)?,
        transaction_date: row.get(6)?,
        description: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Insert transaction, returning the stored row
pub fn insert_transaction(
    conn: &Connection,
    tx: &NewTransaction,
    now: DateTime<Utc>,
) -> Result<Transaction> {
    conn.execute(
        "INSERT INTO transactions (
            user_id, transaction_type, weight_grams, price_per_gram, total_price,
            transaction_date, description, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            tx.user_id,
            tx.transaction_type.as_str(),
            tx.weight_grams.to_string(),
            tx.price_per_gram.to_string(),
            tx.total_price.to_string(),
            tx.transaction_date,
            tx.description,
            now,
        ],
    )?;

    let id = conn.last_insert_rowid();
    debug!("Inserted transaction {} for user {}", id, tx.user_id);
    get_transaction(conn, tx.user_id, id)
}

/// Get a user's transaction by id
pub fn get_transaction(conn: &Connection, user_id: i64, id: i64) -> Result<Transaction> {
    let sql = format!(
        "SELECT {} FROM transactions WHERE id = ?1 AND user_id = ?2",
        TRANSACTION_COLUMNS
    );
    conn.query_row(&sql, params![id, user_id], transaction_from_row)
        .optional()?
        .ok_or_else(|| not_found("transaction", id))
}

/// Apply a partial update; weight/price changes re-derive the total
pub fn update_transaction(
    conn: &Connection,
    user_id: i64,
    id: i64,
    update: &TransactionUpdate,
    now: DateTime<Utc>,
) -> Result<Transaction> {
    let current = get_transaction(conn, user_id, id)?;
    let updated = current.apply_update(update, now)?;

    conn.execute(
        "UPDATE transactions
         SET transaction_type = ?1, weight_grams = ?2, price_per_gram = ?3, total_price = ?4,
             transaction_date = ?5, description = ?6, updated_at = ?7
         WHERE id = ?8 AND user_id = ?9",
        params![
            updated.transaction_type.as_str(),
            updated.weight_grams.to_string(),
            updated.price_per_gram.to_string(),
            updated.total_price.to_string(),
            updated.transaction_date,
            updated.description,
            updated.updated_at,
            id,
            user_id,
        ],
    )?;

    Ok(updated)
}

/// Delete a user's transaction
pub fn delete_transaction(conn: &Connection, user_id: i64, id: i64) -> Result<()> {
    let deleted = conn.execute(
        "DELETE FROM transactions WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if deleted == 0 {
        return Err(not_found("transaction", id));
    }
    Ok(())
}

/// All transactions of a user, oldest first
pub fn list_transactions(conn: &Connection, user_id: i64) -> Result<Vec<Transaction>> {
    let sql = format!(
        "SELECT {} FROM transactions WHERE user_id = ?1
         ORDER BY transaction_date ASC, id ASC",
        TRANSACTION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let transactions = stmt
        .query_map([user_id], transaction_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}

// ---------------------------------------------------------------------------
// Goals
// ---------------------------------------------------------------------------

const GOAL_COLUMNS: &str = "id, user_id, title, description, target_weight_grams, deadline,
     is_completed, created_at, updated_at";

fn goal_from_row(row: &rusqlite::Row) -> Result<Goal, rusqlite::Error> {
    Ok(Goal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        target_weight_grams: get_decimal_value(row, 4)?,
        deadline: row.get(5)?,
        is_completed: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Insert goal, returning the stored row
pub fn insert_goal(conn: &Connection, goal: &NewGoal, now: DateTime<Utc>) -> Result<Goal> {
    conn.execute(
        "INSERT INTO goals (
            user_id, title, description, target_weight_grams, deadline, is_completed,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
        params![
            goal.user_id,
            goal.title,
            goal.description,
            goal.target_weight_grams.to_string(),
            goal.deadline,
            now,
        ],
    )?;

    get_goal(conn, goal.user_id, conn.last_insert_rowid())
}

/// Get a goal owned by the user; another user's goal is reported as not found
pub fn get_goal(conn: &Connection, user_id: i64, id: i64) -> Result<Goal> {
    let sql = format!(
        "SELECT {} FROM goals WHERE id = ?1 AND user_id = ?2",
        GOAL_COLUMNS
    );
    conn.query_row(&sql, params![id, user_id], goal_from_row)
        .optional()?
        .ok_or_else(|| not_found("goal", id))
}

pub fn update_goal(
    conn: &Connection,
    user_id: i64,
    id: i64,
    update: &GoalUpdate,
    now: DateTime<Utc>,
) -> Result<Goal> {
    let updated = get_goal(conn, user_id, id)?.apply_update(update, now)?;

    conn.execute(
        "UPDATE goals
         SET title = ?1, description = ?2, target_weight_grams = ?3, deadline = ?4, updated_at = ?5
         WHERE id = ?6 AND user_id = ?7",
        params![
            updated.title,
            updated.description,
            updated.target_weight_grams.to_string(),
            updated.deadline,
            updated.updated_at,
            id,
            user_id,
        ],
    )?;

    Ok(updated)
}

/// Explicitly mark a goal as completed (or reopen it)
pub fn set_goal_completed(
    conn: &Connection,
    user_id: i64,
    id: i64,
    completed: bool,
    now: DateTime<Utc>,
) -> Result<Goal> {
    let changed = conn.execute(
        "UPDATE goals SET is_completed = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
        params![completed, now, id, user_id],
    )?;
    if changed == 0 {
        return Err(not_found("goal", id));
    }
    get_goal(conn, user_id, id)
}

pub fn delete_goal(conn: &Connection, user_id: i64, id: i64) -> Result<()> {
    let deleted = conn.execute(
        "DELETE FROM goals WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if deleted == 0 {
        return Err(not_found("goal", id));
    }
    Ok(())
}

/// All goals of a user, nearest deadline first
pub fn list_goals(conn: &Connection, user_id: i64) -> Result<Vec<Goal>> {
    let sql = format!(
        "SELECT {} FROM goals WHERE user_id = ?1 ORDER BY deadline ASC, id ASC",
        GOAL_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let goals = stmt
        .query_map([user_id], goal_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(goals)
}

// ---------------------------------------------------------------------------
// Zakat records
// ---------------------------------------------------------------------------

const ZAKAT_COLUMNS: &str = "id, user_id, gold_weight_grams, holding_start_date, is_eligible,
     next_reminder_date, created_at, updated_at";

fn zakat_from_row(row: &rusqlite::Row) -> Result<ZakatRecord, rusqlite::Error> {
    Ok(ZakatRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        gold_weight_grams: get_decimal_value(row, 2)?,
        holding_start_date: row.get(3)?,
        is_eligible: row.get(4)?,
        next_reminder_date: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Current zakat record of a user, if one was ever computed
pub fn get_zakat_record(conn: &Connection, user_id: i64) -> Result<Option<ZakatRecord>> {
    let sql = format!(
        "SELECT {} FROM zakat_records WHERE user_id = ?1",
        ZAKAT_COLUMNS
    );
    let record = conn
        .query_row(&sql, [user_id], zakat_from_row)
        .optional()?;
    Ok(record)
}

/// Insert the user's record or overwrite the existing one
pub fn upsert_zakat_record(
    conn: &Connection,
    user_id: i64,
    state: &ZakatState,
    now: DateTime<Utc>,
) -> Result<ZakatRecord> {
    conn.execute(
        "INSERT INTO zakat_records (
            user_id, gold_weight_grams, holding_start_date, is_eligible, next_reminder_date,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        ON CONFLICT(user_id) DO UPDATE SET
            gold_weight_grams = excluded.gold_weight_grams,
            holding_start_date = excluded.holding_start_date,
            is_eligible = excluded.is_eligible,
            next_reminder_date = excluded.next_reminder_date,
            updated_at = excluded.updated_at",
        params![
            user_id,
            state.gold_weight_grams.to_string(),
            state.holding_start_date,
            state.is_eligible,
            state.next_reminder_date,
            now,
        ],
    )?;

    get_zakat_record(conn, user_id)?.ok_or_else(|| {
        TrackerError::Database(format!("zakat record for user {} vanished", user_id)).into()
    })
}

/// Move a record's reminder date
pub fn update_reminder_date(
    conn: &Connection,
    record_id: i64,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<ZakatRecord> {
    let changed = conn.execute(
        "UPDATE zakat_records SET next_reminder_date = ?1, updated_at = ?2 WHERE id = ?3",
        params![date, now, record_id],
    )?;
    if changed == 0 {
        return Err(not_found("zakat record", record_id));
    }

    let sql = format!("SELECT {} FROM zakat_records WHERE id = ?1", ZAKAT_COLUMNS);
    Ok(conn.query_row(&sql, [record_id], zakat_from_row)?)
}

/// Eligible records whose reminder is due on or before `as_of`
pub fn list_due_reminders(conn: &Connection, as_of: NaiveDate) -> Result<Vec<ZakatRecord>> {
    let sql = format!(
        "SELECT {} FROM zakat_records
         WHERE is_eligible = 1 AND next_reminder_date IS NOT NULL AND next_reminder_date <= ?1
         ORDER BY next_reminder_date ASC, user_id ASC",
        ZAKAT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map([as_of], zakat_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn create_test_db() -> (TempDir, Connection) {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        init_database(Some(db_path.clone())).unwrap();
        let conn = open_db(Some(db_path)).unwrap();
        (temp_dir, conn)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn state(
        weight: Decimal,
        start: Option<NaiveDate>,
        is_eligible: bool,
        reminder: Option<NaiveDate>,
    ) -> ZakatState {
        ZakatState {
            gold_weight_grams: weight,
            holding_start_date: start,
            is_eligible,
            next_reminder_date: reminder,
        }
    }

    fn buy(user_id: i64, weight: Decimal, on: NaiveDate) -> NewTransaction {
        NewTransaction::new(user_id, TransactionType::Buy, weight, dec!(60), on, None).unwrap()
    }

    fn assert_not_found(err: anyhow::Error) {
        assert!(
            matches!(
                err.downcast_ref::<TrackerError>(),
                Some(TrackerError::NotFound(_))
            ),
            "expected NotFound, got {:?}",
            err
        );
    }

    #[test]
    fn test_init_database_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("test.db");

        init_database(Some(db_path.clone())).unwrap();
        init_database(Some(db_path.clone())).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'
                 AND name IN ('transactions', 'goals', 'zakat_records')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(table_count, 3);
    }

    #[test]
    fn test_transaction_round_trip_keeps_decimals() {
        let (_dir, conn) = create_test_db();
        let new_tx = NewTransaction::new(
            1,
            TransactionType::Buy,
            dec!(10.5),
            dec!(65.75),
            date(2025, 3, 1),
            Some("bar".to_string()),
        )
        .unwrap();

        let stored = insert_transaction(&conn, &new_tx, Utc::now()).unwrap();
        assert_eq!(stored.total_price, dec!(690.38));
        assert_eq!(stored.weight_grams, dec!(10.5));
        assert_eq!(stored.description.as_deref(), Some("bar"));

        let fetched = get_transaction(&conn, 1, stored.id).unwrap();
        assert_eq!(fetched, stored);
    }

    #[test]
    fn test_update_transaction_rederives_total() {
        let (_dir, conn) = create_test_db();
        let stored = insert_transaction(&conn, &buy(1, dec!(10), date(2025, 3, 1)), Utc::now())
            .unwrap();

        let update = TransactionUpdate {
            price_per_gram: Some(dec!(65.75)),
            weight_grams: Some(dec!(10.5)),
            ..Default::default()
        };
        update_transaction(&conn, 1, stored.id, &update, Utc::now()).unwrap();

        let fetched = get_transaction(&conn, 1, stored.id).unwrap();
        assert_eq!(fetched.total_price, dec!(690.38));
    }

    #[test]
    fn test_transactions_are_scoped_to_user() {
        let (_dir, conn) = create_test_db();
        let stored = insert_transaction(&conn, &buy(1, dec!(10), date(2025, 3, 1)), Utc::now())
            .unwrap();

        assert_not_found(get_transaction(&conn, 2, stored.id).unwrap_err());
        assert_not_found(delete_transaction(&conn, 2, stored.id).unwrap_err());
        delete_transaction(&conn, 1, stored.id).unwrap();
        assert_not_found(delete_transaction(&conn, 1, stored.id).unwrap_err());
    }

    #[test]
    fn test_list_transactions_orders_by_date() {
        let (_dir, conn) = create_test_db();
        let now = Utc::now();
        insert_transaction(&conn, &buy(1, dec!(3), date(2025, 5, 1)), now).unwrap();
        insert_transaction(&conn, &buy(1, dec!(1), date(2024, 1, 1)), now).unwrap();
        insert_transaction(&conn, &buy(1, dec!(2), date(2024, 6, 1)), now).unwrap();
        insert_transaction(&conn, &buy(2, dec!(9), date(2023, 1, 1)), now).unwrap();

        let weights: Vec<Decimal> = list_transactions(&conn, 1)
            .unwrap()
            .into_iter()
            .map(|t| t.weight_grams)
            .collect();
        assert_eq!(weights, vec![dec!(1), dec!(2), dec!(3)]);
    }

    #[test]
    fn test_goal_lifecycle() {
        let (_dir, conn) = create_test_db();
        let now = Utc::now();
        let later = insert_goal(
            &conn,
            &NewGoal::new(1, "Hajj fund", dec!(200), date(2027, 1, 1), None).unwrap(),
            now,
        )
        .unwrap();
        let sooner = insert_goal(
            &conn,
            &NewGoal::new(1, "Wedding set", dec!(50), date(2026, 6, 1), None).unwrap(),
            now,
        )
        .unwrap();
        assert!(!later.is_completed);

        let titles: Vec<String> = list_goals(&conn, 1)
            .unwrap()
            .into_iter()
            .map(|g| g.title)
            .collect();
        assert_eq!(titles, vec!["Wedding set", "Hajj fund"]);

        let completed = set_goal_completed(&conn, 1, sooner.id, true, now).unwrap();
        assert!(completed.is_completed);

        let renamed = update_goal(
            &conn,
            1,
            later.id,
            &GoalUpdate {
                title: Some("Hajj".to_string()),
                ..Default::default()
            },
            now,
        )
        .unwrap();
        assert_eq!(renamed.title, "Hajj");
        assert_eq!(renamed.target_weight_grams, dec!(200));

        assert_not_found(get_goal(&conn, 2, later.id).unwrap_err());
        delete_goal(&conn, 1, later.id).unwrap();
        assert_eq!(list_goals(&conn, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_zakat_record_keeps_one_row_per_user() {
        let (_dir, conn) = create_test_db();
        let now = Utc::now();

        let first = upsert_zakat_record(
            &conn,
            1,
            &state(dec!(90), Some(date(2025, 1, 1)), false, None),
            now,
        )
        .unwrap();
        let second = upsert_zakat_record(
            &conn,
            1,
            &state(
                dec!(120),
                Some(date(2025, 1, 1)),
                true,
                Some(date(2026, 12, 10)),
            ),
            now,
        )
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.gold_weight_grams, dec!(120));
        assert!(second.is_eligible);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM zakat_records", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_due_reminders_and_advance() {
        let (_dir, conn) = create_test_db();
        let now = Utc::now();
        let due = upsert_zakat_record(
            &conn,
            1,
            &state(
                dec!(100),
                Some(date(2024, 1, 1)),
                true,
                Some(date(2025, 12, 9)),
            ),
            now,
        )
        .unwrap();
        upsert_zakat_record(
            &conn,
            2,
            &state(
                dec!(100),
                Some(date(2025, 1, 1)),
                true,
                Some(date(2026, 12, 9)),
            ),
            now,
        )
        .unwrap();
        upsert_zakat_record(&conn, 3, &state(dec!(10), None, false, None), now).unwrap();

        let listed = list_due_reminders(&conn, date(2025, 12, 9)).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user_id, 1);

        let moved = update_reminder_date(&conn, due.id, date(2026, 11, 28), now).unwrap();
        assert_eq!(moved.next_reminder_date, Some(date(2026, 11, 28)));
        assert!(list_due_reminders(&conn, date(2025, 12, 9)).unwrap().is_empty());

        assert_not_found(update_reminder_date(&conn, 999, date(2026, 1, 1), now).unwrap_err());
    }
}
