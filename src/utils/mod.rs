//! Utility functions for rounding and formatting
//!
//! Weights are kept at 3 decimal places and money at 2, both rounded half-up
//! (away from zero on the midpoint). Formatting helpers give the CLI a
//! consistent display of dollars and grams.

use anyhow::Result;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::TrackerError;

/// Decimal places kept for weights in grams
pub const WEIGHT_DP: u32 = 3;
/// Decimal places kept for money and percentages
pub const MONEY_DP: u32 = 2;

/// Round to cents, half-up
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to milligrams, half-up
pub fn round_weight(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(WEIGHT_DP, RoundingStrategy::MidpointAwayFromZero)
}

fn out_of_range(what: &str) -> anyhow::Error {
    TrackerError::Validation(format!("{} is out of range", what)).into()
}

/// `a + b`, or a Validation error naming `what` if the sum does not fit
pub fn checked_add(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_add(b).ok_or_else(|| out_of_range(what))
}

/// `a × b`, or a Validation error naming `what` if the product does not fit
pub fn checked_mul(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_mul(b).ok_or_else(|| out_of_range(what))
}

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include "$" prefix
    Usd,
    /// No currency symbol (for table cells)
    None,
}

/// Format a value as dollars with thousands separators.
///
/// # Examples
/// ```
/// use goldtrack::utils::{format_currency_with_symbol, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency_with_symbol(dec!(1234.5), CurrencySymbol::Usd), "$1,234.50");
/// assert_eq!(format_currency_with_symbol(dec!(-12), CurrencySymbol::None), "-12.00");
/// ```
pub fn format_currency_with_symbol(value: Decimal, symbol: CurrencySymbol) -> String {
    let is_negative = value < Decimal::ZERO;
    let formatted = format!("{:.2}", round_money(value.abs()));
    let (integer_part, decimal_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), "00"));

    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec![',', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative { "-" } else { "" };
    let prefix = match symbol {
        CurrencySymbol::Usd => "$",
        CurrencySymbol::None => "",
    };

    format!("{}{}{}.{}", sign, prefix, with_separators, decimal_part)
}

/// Format as dollars ("$1,234.56")
pub fn format_currency(value: Decimal) -> String {
    format_currency_with_symbol(value, CurrencySymbol::Usd)
}

/// Format a weight in grams ("12.500 g")
pub fn format_grams(value: Decimal) -> String {
    format!("{:.3} g", round_weight(value))
}
