//! Portfolio performance calculation
//!
//! `lots` matches sells against buy lots per symbol; `portfolio` sums the
//! per-symbol results. `evaluate_portfolio` is the glue used by callers
//! that already hold loaded transactions and fetched quotes - the engine
//! never reaches into the database or the network itself.

pub mod lots;
pub mod portfolio;

use std::collections::{BTreeMap, HashMap};

use crate::db::Transaction;
use crate::quotes::QuoteSnapshot;

pub use lots::{
    evaluate_symbol, BuyDetails, CalculatedTransaction, LotDetails, SellDetails, SymbolResult,
};
pub use portfolio::{aggregate, PortfolioPerformance};

/// Full evaluation output for one portfolio
#[derive(Debug, Clone)]
pub struct PortfolioReport {
    /// Per-symbol results in the portfolio's symbol order
    pub symbols: Vec<(String, SymbolResult)>,
    pub summary: PortfolioPerformance,
}

/// Evaluate every symbol of a portfolio and aggregate the totals
///
/// `symbols` fixes the output order; symbols without transactions still
/// appear (all-null result, cost zero), and symbols without a quote are
/// evaluated quoteless.
pub fn evaluate_portfolio(
    symbols: &[String],
    transactions_by_symbol: &BTreeMap<String, Vec<Transaction>>,
    quotes: &HashMap<String, QuoteSnapshot>,
) -> PortfolioReport {
    static EMPTY: Vec<Transaction> = Vec::new();

    let results: Vec<(String, SymbolResult)> = symbols
        .iter()
        .map(|symbol| {
            let transactions = transactions_by_symbol.get(symbol).unwrap_or(&EMPTY);
            let result = evaluate_symbol(transactions, quotes.get(symbol));
            (symbol.clone(), result)
        })
        .collect();

    let summary = aggregate(results.iter().map(|(_, r)| r));

    PortfolioReport {
        symbols: results,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TransactionType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_evaluate_portfolio_covers_all_symbols() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let ts = NaiveDate::from_ymd_opt(2024, 2, 2)
            .unwrap()
            .and_hms_opt(16, 0, 0)
            .unwrap();

        let symbols = vec!["AAPL".to_string(), "MSFT".to_string()];
        let mut transactions = BTreeMap::new();
        transactions.insert(
            "AAPL".to_string(),
            vec![Transaction::new(
                TransactionType::Buy,
                dec!(10),
                dec!(100),
                date,
            )],
        );

        let mut quotes = HashMap::new();
        quotes.insert(
            "AAPL".to_string(),
            QuoteSnapshot {
                symbol: "AAPL".to_string(),
                close: dec!(160),
                previous_close: dec!(155),
                change_percent: dec!(3.22),
                timestamp: ts,
            },
        );

        let report = evaluate_portfolio(&symbols, &transactions, &quotes);

        assert_eq!(report.symbols.len(), 2);
        assert_eq!(report.symbols[0].0, "AAPL");
        assert_eq!(report.symbols[0].1.value, Some(dec!(1600)));
        // MSFT has neither transactions nor a quote
        assert_eq!(report.symbols[1].1.cost, dec!(0));
        assert_eq!(report.symbols[1].1.value, None);

        assert_eq!(report.summary.total, dec!(600));
        assert_eq!(report.summary.total_percent, dec!(60));
    }
}
