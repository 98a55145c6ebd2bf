use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Transaction type (buy or sell)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
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
            "BUY" => Ok(TransactionType::Buy),
            "SELL" => Ok(TransactionType::Sell),
            _ => Err(()),
        }
    }
}

/// A buy or sell of one instrument inside a portfolio
///
/// Scoped to a (portfolio_id, symbol) pair by the store; the struct itself
/// only carries the trade facts. Dates are day-granularity, pinned to a
/// canonical intraday time by the importers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub price: Decimal,
    pub date: NaiveDateTime,
}

impl Transaction {
    pub fn new(
        tx_type: TransactionType,
        amount: Decimal,
        price: Decimal,
        date: NaiveDateTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tx_type,
            amount,
            price,
            date,
        }
    }

    /// Validate the trade facts before persisting
    ///
    /// Soft check used by manual entry and the import pipeline; the caller
    /// decides whether a failure aborts or is counted as skipped.
    pub fn validate(&self) -> Result<(), String> {
        if self.amount <= Decimal::ZERO {
            return Err("Invalid amount (must be positive)".to_string());
        }
        if self.price <= Decimal::ZERO {
            return Err("Invalid price (must be positive)".to_string());
        }
        Ok(())
    }
}

/// A named portfolio owning a distinct list of instrument symbols
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Portfolio {
    pub id: String,
    pub name: String,
    pub symbols: Vec<String>,
}
