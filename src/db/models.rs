use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::TrackerError;
use crate::utils::{round_money, round_weight};

/// Transaction type (buy or sell)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Buy,
    Sell,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "BUY",
            TransactionType::Sell => "SELL",
        }
    }
}

impl FromStr for TransactionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" | "B" => Ok(TransactionType::Buy),
            "SELL" | "S" => Ok(TransactionType::Sell),
            _ => Err(()),
        }
    }
}

/// Total price of a trade: weight × price, rounded half-up to cents
pub fn total_price(weight_grams: Decimal, price_per_gram: Decimal) -> Result<Decimal> {
    weight_grams
        .checked_mul(price_per_gram)
        .map(round_money)
        .ok_or_else(|| {
            validation(format!(
                "total price of {} g at {} per gram is out of range",
                weight_grams, price_per_gram
            ))
        })
}

fn validation(msg: impl Into<String>) -> anyhow::Error {
    TrackerError::Validation(msg.into()).into()
}

fn require_positive(value: Decimal, field: &str) -> Result<()> {
    if value <= Decimal::ZERO {
        return Err(validation(format!("{} must be greater than zero", field)));
    }
    Ok(())
}

/// Buy or sell of physical gold, owned by one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub transaction_type: TransactionType,
    pub weight_grams: Decimal,
    pub price_per_gram: Decimal,
    pub total_price: Decimal,
    pub transaction_date: NaiveDate,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new transaction
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub user_id: i64,
    pub transaction_type: TransactionType,
    pub weight_grams: Decimal,
    pub price_per_gram: Decimal,
    pub total_price: Decimal,
    pub transaction_date: NaiveDate,
    pub description: Option<String>,
}

impl NewTransaction {
    /// Normalise precision (weight 3 dp, price 2 dp) and derive the total
    pub fn new(
        user_id: i64,
        transaction_type: TransactionType,
        weight_grams: Decimal,
        price_per_gram: Decimal,
        transaction_date: NaiveDate,
        description: Option<String>,
    ) -> Result<Self> {
        require_positive(weight_grams, "weight")?;
        require_positive(price_per_gram, "price per gram")?;

        let weight_grams = round_weight(weight_grams);
        let price_per_gram = round_money(price_per_gram);
        require_positive(weight_grams, "weight")?;
        require_positive(price_per_gram, "price per gram")?;
        let total_price = total_price(weight_grams, price_per_gram)?;

        Ok(Self {
            user_id,
            transaction_type,
            weight_grams,
            price_per_gram,
            total_price,
            transaction_date,
            description,
        })
    }
}

/// Partial update of a transaction; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionUpdate {
    pub transaction_type: Option<TransactionType>,
    pub weight_grams: Option<Decimal>,
    pub price_per_gram: Option<Decimal>,
    pub transaction_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl Transaction {
    /// Apply an update, re-deriving `total_price` from the resulting values
    pub fn apply_update(&self, update: &TransactionUpdate, now: DateTime<Utc>) -> Result<Self> {
        let rebuilt = NewTransaction::new(
            self.user_id,
            update.transaction_type.unwrap_or(self.transaction_type),
            update.weight_grams.unwrap_or(self.weight_grams),
            update.price_per_gram.unwrap_or(self.price_per_gram),
            update.transaction_date.unwrap_or(self.transaction_date),
            update
                .description
                .clone()
                .or_else(|| self.description.clone()),
        )?;

        Ok(Self {
            id: self.id,
            user_id: self.user_id,
            transaction_type: rebuilt.transaction_type,
            weight_grams: rebuilt.weight_grams,
            price_per_gram: rebuilt.price_per_gram,
            total_price: rebuilt.total_price,
            transaction_date: rebuilt.transaction_date,
            description: rebuilt.description,
            created_at: self.created_at,
            updated_at: now,
        })
    }

    /// Signed weight contribution to holdings
    pub fn signed_weight(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Buy => self.weight_grams,
            TransactionType::Sell => -self.weight_grams,
        }
    }
}

/// Savings goal expressed as a target weight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub target_weight_grams: Decimal,
    pub deadline: NaiveDate,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new goal
#[derive(Debug, Clone, PartialEq)]
pub struct NewGoal {
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub target_weight_grams: Decimal,
    pub deadline: NaiveDate,
}

impl NewGoal {
    pub fn new(
        user_id: i64,
        title: &str,
        target_weight_grams: Decimal,
        deadline: NaiveDate,
        description: Option<String>,
    ) -> Result<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(validation("goal title cannot be empty"));
        }
        require_positive(target_weight_grams, "target weight")?;

        Ok(Self {
            user_id,
            title: title.to_string(),
            description,
            target_weight_grams: round_weight(target_weight_grams),
            deadline,
        })
    }
}

/// Partial update of a goal; completion has its own explicit action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_weight_grams: Option<Decimal>,
    pub deadline: Option<NaiveDate>,
}

impl Goal {
    pub fn apply_update(&self, update: &GoalUpdate, now: DateTime<Utc>) -> Result<Self> {
        let rebuilt = NewGoal::new(
            self.user_id,
            update.title.as_deref().unwrap_or(&self.title),
            update
                .target_weight_grams
                .unwrap_or(self.target_weight_grams),
            update.deadline.unwrap_or(self.deadline),
            update
                .description
                .clone()
                .or_else(|| self.description.clone()),
        )?;

        Ok(Self {
            title: rebuilt.title,
            description: rebuilt.description,
            target_weight_grams: rebuilt.target_weight_grams,
            deadline: rebuilt.deadline,
            updated_at: now,
            ..self.clone()
        })
    }
}

/// Persisted zakat state, one row per user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZakatRecord {
    pub id: i64,
    pub user_id: i64,
    /// Holdings at the last recalculation
    pub gold_weight_grams: Decimal,
    /// Start of the current continuous run at or above nisab
    pub holding_start_date: Option<NaiveDate>,
    pub is_eligible: bool,
    pub next_reminder_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a zakat evaluation, as written to `zakat_records`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZakatState {
    pub gold_weight_grams: Decimal,
    pub holding_start_date: Option<NaiveDate>,
    pub is_eligible: bool,
    pub next_reminder_date: Option<NaiveDate>,
}
