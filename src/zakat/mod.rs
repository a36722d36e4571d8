// Zakat module - nisab threshold, hawl tracking and obligation amounts

pub mod hawl;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::db::{self, Transaction, ZakatRecord, ZakatState};
use crate::error::TrackerError;
use crate::reports::compute_holdings;
use crate::utils::{checked_mul, round_money};

/// Minimum weight in grams on which zakat can accrue
pub const NISAB_GRAMS: Decimal = Decimal::from_parts(85, 0, 0, false, 0);
/// One lunar year in days
pub const REQUIRED_DAYS: i64 = 354;
/// 2.5%
pub const ZAKAT_RATE: Decimal = Decimal::from_parts(25, 0, 0, false, 3);

/// Next reminder falls one lunar year after the year that made the holding eligible
const REMINDER_OFFSET_DAYS: u64 = 2 * REQUIRED_DAYS as u64;

/// Evaluate a user's zakat state from the full ledger and the previously
/// stored record.
///
/// A stored holding start date is kept as long as the holding has stayed at
/// or above nisab since that date. If the ledger shows a dip below nisab
/// after it (or there is no usable prior record), the start date is
/// re-anchored at the transaction that began the current run.
///
/// While the start date is unchanged, a stored reminder that was moved past
/// `start + 708` days (see [`advance_reminder`]) is kept.
pub fn evaluate(
    transactions: &[Transaction],
    prior: Option<&ZakatRecord>,
    today: NaiveDate,
) -> Result<ZakatState> {
    let holdings = compute_holdings(transactions)?;

    if holdings < NISAB_GRAMS {
        return Ok(ZakatState {
            gold_weight_grams: holdings,
            holding_start_date: None,
            is_eligible: false,
            next_reminder_date: None,
        });
    }

    let run_start = hawl::current_run_start(transactions, NISAB_GRAMS)?;
    let anchored = prior
        .filter(|record| record.gold_weight_grams >= NISAB_GRAMS)
        .and_then(|record| record.holding_start_date)
        .filter(|start| run_start.is_none_or(|run| *start >= run));

    let holding_start_date = anchored.or(run_start).unwrap_or(today);
    let is_eligible = hawl::days_held(holding_start_date, today) >= REQUIRED_DAYS;

    let advanced = prior
        .filter(|record| record.holding_start_date == Some(holding_start_date))
        .and_then(|record| record.next_reminder_date);
    let next_reminder_date = is_eligible.then(|| {
        let derived = hawl::add_days(holding_start_date, REMINDER_OFFSET_DAYS);
        advanced.map_or(derived, |stored| stored.max(derived))
    });

    Ok(ZakatState {
        gold_weight_grams: holdings,
        holding_start_date: Some(holding_start_date),
        is_eligible,
        next_reminder_date,
    })
}

/// Zakat owed on a state at the given price; zero unless the state is eligible
pub fn zakat_amount(state: Option<&ZakatState>, price_per_gram: Decimal) -> Result<Decimal> {
    match state {
        Some(state) if state.is_eligible => {
            let value = checked_mul(state.gold_weight_grams, price_per_gram, "holdings value")?;
            Ok(round_money(checked_mul(value, ZAKAT_RATE, "zakat amount")?))
        }
        _ => Ok(Decimal::ZERO),
    }
}

impl From<&ZakatRecord> for ZakatState {
    fn from(record: &ZakatRecord) -> Self {
        Self {
            gold_weight_grams: record.gold_weight_grams,
            holding_start_date: record.holding_start_date,
            is_eligible: record.is_eligible,
            next_reminder_date: record.next_reminder_date,
        }
    }
}

/// Read-only view of a zakat state for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZakatStatus {
    pub gold_weight_grams: Decimal,
    pub nisab_grams: Decimal,
    pub meets_nisab: bool,
    pub holding_start_date: Option<NaiveDate>,
    pub days_held: Option<i64>,
    pub days_until_eligible: Option<i64>,
    pub is_eligible: bool,
    pub next_reminder_date: Option<NaiveDate>,
    pub zakat_due: Option<Decimal>,
}

impl ZakatStatus {
    pub fn from_state(
        state: &ZakatState,
        today: NaiveDate,
        price_per_gram: Option<Decimal>,
    ) -> Result<Self> {
        let meets_nisab = state.gold_weight_grams >= NISAB_GRAMS;
        let days_held = state
            .holding_start_date
            .filter(|_| meets_nisab)
            .map(|start| hawl::days_held(start, today));
        let days_until_eligible = days_held.map(|held| (REQUIRED_DAYS - held).max(0));

        let zakat_due = price_per_gram
            .map(|price| zakat_amount(Some(state), price))
            .transpose()?;

        Ok(Self {
            gold_weight_grams: state.gold_weight_grams,
            nisab_grams: NISAB_GRAMS,
            meets_nisab,
            holding_start_date: state.holding_start_date,
            days_held,
            days_until_eligible,
            is_eligible: state.is_eligible,
            next_reminder_date: state.next_reminder_date,
            zakat_due,
        })
    }
}

/// Recompute and persist a user's zakat record.
///
/// The read of the ledger and prior record and the upsert run inside one
/// IMMEDIATE transaction, so concurrent recalculations for the same user are
/// serialized by SQLite's write lock.
pub fn recalculate(
    conn: &mut Connection,
    user_id: i64,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<ZakatRecord> {
    let tx = db::begin_write(conn)?;
    let record = recalculate_in(&tx, user_id, today, now)?;
    tx.commit().context("Failed to commit zakat recalculation")?;
    Ok(record)
}

/// Apply a ledger change and recompute the user's zakat record in one
/// IMMEDIATE transaction. Either both are stored or neither is.
pub fn with_recalculation<T>(
    conn: &mut Connection,
    user_id: i64,
    today: NaiveDate,
    now: DateTime<Utc>,
    change: impl FnOnce(&Connection) -> Result<T>,
) -> Result<(T, ZakatRecord)> {
    let tx = db::begin_write(conn)?;
    let changed = change(&tx)?;
    let record = recalculate_in(&tx, user_id, today, now)?;
    tx.commit().context("Failed to commit ledger change")?;
    Ok((changed, record))
}

/// Recompute and upsert using a transaction the caller already holds
pub fn recalculate_in(
    tx: &rusqlite::Transaction<'_>,
    user_id: i64,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<ZakatRecord> {
    let transactions = db::list_transactions(tx, user_id)?;
    let prior = db::get_zakat_record(tx, user_id)?;
    let state = evaluate(&transactions, prior.as_ref(), today)?;

    match prior.as_ref() {
        Some(previous) if previous.holding_start_date != state.holding_start_date => {
            info!(
                "User {} holding start moved from {:?} to {:?}",
                user_id, previous.holding_start_date, state.holding_start_date
            );
        }
        None => debug!("User {} has no zakat record yet", user_id),
        _ => {}
    }
    if state.is_eligible && !prior.as_ref().is_some_and(|p| p.is_eligible) {
        info!("User {} became eligible for zakat", user_id);
    }

    db::upsert_zakat_record(tx, user_id, &state, now)
}

/// Zakat status as of `today` without persisting anything
pub fn current_status(
    conn: &Connection,
    user_id: i64,
    today: NaiveDate,
    price_per_gram: Option<Decimal>,
) -> Result<ZakatStatus> {
    let transactions = db::list_transactions(conn, user_id)?;
    let prior = db::get_zakat_record(conn, user_id)?;
    let state = evaluate(&transactions, prior.as_ref(), today)?;
    ZakatStatus::from_state(&state, today, price_per_gram)
}

/// Zakat owed by a user according to the stored record
pub fn calculate_zakat_amount(
    conn: &Connection,
    user_id: i64,
    price_per_gram: Decimal,
) -> Result<Decimal> {
    if price_per_gram < Decimal::ZERO {
        return Err(
            TrackerError::Validation("price per gram cannot be negative".to_string()).into(),
        );
    }
    let record = db::get_zakat_record(conn, user_id)?;
    zakat_amount(record.as_ref().map(ZakatState::from).as_ref(), price_per_gram)
}

/// Eligible records whose reminder date has arrived
pub fn users_due_for_reminder(conn: &Connection, today: NaiveDate) -> Result<Vec<ZakatRecord>> {
    db::list_due_reminders(conn, today)
}

/// Move a record's next reminder; NotFound if the record does not exist
pub fn advance_reminder(
    conn: &Connection,
    record_id: i64,
    new_date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<ZakatRecord> {
    let record = db::update_reminder_date(conn, record_id, new_date, now)?;
    info!("Zakat reminder {} moved to {}", record_id, new_date);
    Ok(record)
}
