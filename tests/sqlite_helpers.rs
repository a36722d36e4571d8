#![allow(dead_code)]

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::PathBuf;
use tempfile::TempDir;

pub fn db_path(home: &TempDir) -> PathBuf {
    home.path().join(".goldtrack").join("data.db")
}

pub fn open_conn(home: &TempDir) -> Result<Connection> {
    let path = db_path(home);
    Connection::open(path).context("failed to open test database")
}

pub fn count_zakat_records(conn: &Connection, user_id: i64) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM zakat_records WHERE user_id = ?1",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn zakat_start_date(conn: &Connection, user_id: i64) -> Result<Option<String>> {
    let start = conn.query_row(
        "SELECT holding_start_date FROM zakat_records WHERE user_id = ?1",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(start)
}

pub fn stored_total_price(conn: &Connection, id: i64) -> Result<String> {
    let total = conn.query_row(
        "SELECT total_price FROM transactions WHERE id = ?1",
        [id],
        |row| row.get(0),
    )?;
    Ok(total)
}
