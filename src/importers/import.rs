//! CSV import pipeline
//!
//! Linear pipeline with short-circuit failure at each stage:
//! parse -> process rows -> create portfolio -> import transactions.
//! Parse and portfolio-creation failures abort the import; row and
//! transaction errors accumulate into the report instead. Once the
//! portfolio exists the import is not transactional: skipped
//! transactions leave the rest of the batch in place.

use rusqlite::Connection;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::info;

use super::statement_csv::{
    has_complete_transaction_data, parse_date_yyyymmdd, parse_statement, validate_row,
    StatementRow,
};
use crate::db::{self, Portfolio, Transaction, TransactionType};

/// Counters for the user-facing import summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub symbols: usize,
    pub transactions: usize,
    pub skipped: usize,
}

/// Outcome of an import run
///
/// `success` distinguishes full/partial success from failure; partial
/// success keeps `success = true` with a non-empty error list.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub success: bool,
    pub portfolio: Option<Portfolio>,
    pub stats: ImportStats,
    pub errors: Vec<String>,
}

struct ProcessedRows {
    symbols: Vec<String>,
    transactions_by_symbol: BTreeMap<String, Vec<Transaction>>,
    errors: Vec<String>,
}

/// Validate rows, dedupe symbols and group transaction rows by symbol
///
/// Symbols dedupe by first occurrence, case-sensitive. A row that fails
/// validation contributes no transaction but still registers its symbol
/// when one is present. Complete transaction rows become BUY
/// transactions; statements only carry purchases.
fn process_rows(rows: &[StatementRow]) -> ProcessedRows {
    let mut symbols: Vec<String> = Vec::new();
    let mut transactions_by_symbol: BTreeMap<String, Vec<Transaction>> = BTreeMap::new();
    let mut errors = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let row_errors = validate_row(row);

        let mut track_symbol = |symbol: &str| {
            if !symbols.iter().any(|s| s == symbol) {
                symbols.push(symbol.to_string());
            }
        };

        if !row_errors.is_empty() {
            // Row numbers are 1-indexed and offset by the header line
            errors.push(format!("Row {}: {}", index + 2, row_errors.join(", ")));
            if let Some(symbol) = &row.symbol {
                track_symbol(symbol);
            }
            continue;
        }

        let symbol = match &row.symbol {
            Some(symbol) => symbol.clone(),
            None => continue,
        };
        track_symbol(&symbol);

        if has_complete_transaction_data(row) {
            // Validated above, so these conversions cannot fail
            let amount: Option<Decimal> = row.quantity.as_deref().and_then(|s| s.parse().ok());
            let price: Option<Decimal> =
                row.purchase_price.as_deref().and_then(|s| s.parse().ok());
            let date = row.trade_date.as_deref().and_then(parse_date_yyyymmdd);

            if let (Some(amount), Some(price), Some(date)) = (amount, price, date) {
                transactions_by_symbol
                    .entry(symbol)
                    .or_default()
                    .push(Transaction::new(TransactionType::Buy, amount, price, date));
            }
        }
    }

    ProcessedRows {
        symbols,
        transactions_by_symbol,
        errors,
    }
}

fn import_transactions(
    conn: &Connection,
    portfolio_id: &str,
    transactions_by_symbol: &BTreeMap<String, Vec<Transaction>>,
) -> (usize, usize, Vec<String>) {
    let mut imported = 0;
    let mut skipped = 0;
    let mut errors = Vec::new();

    for (symbol, transactions) in transactions_by_symbol {
        for tx in transactions {
            if let Err(message) = tx.validate() {
                errors.push(format!("{}: {}", symbol, message));
                skipped += 1;
                continue;
            }

            match db::save_transaction(conn, portfolio_id, symbol, tx) {
                Ok(()) => imported += 1,
                Err(e) => {
                    errors.push(format!("{}: {}", symbol, e));
                    skipped += 1;
                }
            }
        }
    }

    (imported, skipped, errors)
}

/// Import a CSV statement into a freshly created portfolio
///
/// Never returns an error; every failure mode is reported through the
/// returned `ImportReport`.
pub fn import_from_csv(conn: &Connection, csv_text: &str, portfolio_name: &str) -> ImportReport {
    let mut report = ImportReport::default();

    let rows = match parse_statement(csv_text) {
        Ok(rows) => rows,
        Err(e) => {
            report.errors.push(format!("CSV parse error: {}", e));
            return report;
        }
    };

    let processed = process_rows(&rows);
    report.errors.extend(processed.errors);

    if processed.symbols.is_empty() {
        report.errors.push("No valid symbols found in CSV".to_string());
        return report;
    }

    let portfolio = match db::create_portfolio(conn, portfolio_name, &processed.symbols) {
        Ok(portfolio) => portfolio,
        Err(e) => {
            report.errors.push(format!("Portfolio creation failed: {}", e));
            return report;
        }
    };
    report.stats.symbols = portfolio.symbols.len();

    let (imported, skipped, errors) =
        import_transactions(conn, &portfolio.id, &processed.transactions_by_symbol);
    report.portfolio = Some(portfolio);
    report.stats.transactions = imported;
    report.stats.skipped = skipped;
    report.errors.extend(errors);

    // Transaction-level failures never flip the overall outcome once the
    // portfolio exists.
    report.success = true;

    info!(
        "Imported statement into '{}': {} symbols, {} transactions, {} skipped",
        portfolio_name, report.stats.symbols, report.stats.transactions, report.stats.skipped
    );

    report
}
