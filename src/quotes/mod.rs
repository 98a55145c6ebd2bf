//! Market quote input
//!
//! The engine never fetches prices itself; it receives already-resolved
//! `QuoteSnapshot` values through the `QuoteProvider` seam. Providers may
//! return partial results; a symbol without a snapshot is evaluated with
//! no quote and yields null market metrics.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Latest known price data for one instrument
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub close: Decimal,
    pub previous_close: Decimal,
    pub change_percent: Decimal,
    pub timestamp: NaiveDateTime,
}

/// Source of quote snapshots for a set of symbols
///
/// Implementations may return partial maps; missing entries are not errors.
pub trait QuoteProvider {
    fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, QuoteSnapshot>>;
}

/// Quote provider backed by a JSON snapshot file (array of QuoteSnapshot)
///
/// Used by the CLI so the tool stays free of network calls; the snapshot
/// file is produced by whatever market-data tooling the user runs.
pub struct FileQuoteProvider {
    quotes: HashMap<String, QuoteSnapshot>,
}

impl FileQuoteProvider {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .context(format!("Failed to read quote file {:?}", path))?;
        let snapshots: Vec<QuoteSnapshot> =
            serde_json::from_str(&text).context("Failed to parse quote file as JSON")?;

        let quotes = snapshots
            .into_iter()
            .map(|q| (q.symbol.clone(), q))
            .collect();

        Ok(Self { quotes })
    }
}

impl QuoteProvider for FileQuoteProvider {
    fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, QuoteSnapshot>> {
        Ok(symbols
            .iter()
            .filter_map(|s| self.quotes.get(s).map(|q| (s.clone(), q.clone())))
            .collect())
    }
}

/// In-memory quote provider for tests and embedding
#[derive(Default)]
pub struct StaticQuoteProvider {
    quotes: HashMap<String, QuoteSnapshot>,
}

impl StaticQuoteProvider {
    pub fn new(snapshots: impl IntoIterator<Item = QuoteSnapshot>) -> Self {
        Self {
            quotes: snapshots
                .into_iter()
                .map(|q| (q.symbol.clone(), q))
                .collect(),
        }
    }
}

impl QuoteProvider for StaticQuoteProvider {
    fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, QuoteSnapshot>> {
        Ok(symbols
            .iter()
            .filter_map(|s| self.quotes.get(s).map(|q| (s.clone(), q.clone())))
            .collect())
    }
}
