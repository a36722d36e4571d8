//! Goldtrack - gold holdings tracker
//!
//! This library records gold purchases and sales, measures progress towards
//! savings goals, tracks zakat eligibility (nisab and lunar-year holding
//! period) and prices holdings from a cached spot price feed.

pub mod config;
pub mod db;
pub mod error;
pub mod pricing;
pub mod reports;
pub mod utils;
pub mod zakat;
