//! Broker statement CSV parsing and row validation
//!
//! Statements are comma-separated UTF-8 text with a header row and the
//! columns `Symbol`, `Trade Date` (YYYYMMDD), `Purchase Price` and
//! `Quantity`. Quoted fields may contain the delimiter. Validation is
//! soft: it returns error lists instead of failing, so the import
//! pipeline can report every bad row at once.

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::warn;

pub const COLUMN_SYMBOL: &str = "Symbol";
pub const COLUMN_TRADE_DATE: &str = "Trade Date";
pub const COLUMN_PURCHASE_PRICE: &str = "Purchase Price";
pub const COLUMN_QUANTITY: &str = "Quantity";

/// One statement row reduced to the recognized columns
///
/// Fields hold raw text; `None` means the column was absent or blank.
/// Interpretation happens in `validate_row` /
/// `has_complete_transaction_data`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementRow {
    pub symbol: Option<String>,
    pub trade_date: Option<String>,
    pub purchase_price: Option<String>,
    pub quantity: Option<String>,
}

#[derive(Debug, Default)]
struct ColumnMapping {
    symbol: Option<usize>,
    trade_date: Option<usize>,
    purchase_price: Option<usize>,
    quantity: Option<usize>,
}

impl ColumnMapping {
    fn from_headers(headers: &StringRecord) -> Self {
        let mut mapping = Self::default();
        for (idx, header) in headers.iter().enumerate() {
            match header.trim() {
                COLUMN_SYMBOL => mapping.symbol = Some(idx),
                COLUMN_TRADE_DATE => mapping.trade_date = Some(idx),
                COLUMN_PURCHASE_PRICE => mapping.purchase_price = Some(idx),
                COLUMN_QUANTITY => mapping.quantity = Some(idx),
                _ => {}
            }
        }
        mapping
    }
}

fn field(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    let value = record.get(idx?)?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parse raw statement text into rows
///
/// Fails when there is no header plus at least one data row, or when every
/// data row is malformed. Rows whose field count does not match the header
/// are skipped with a warning naming the 1-indexed row (header included).
pub fn parse_statement(text: &str) -> Result<Vec<StatementRow>> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();

    if lines.len() < 2 {
        return Err(anyhow!("CSV must have header and at least one data row"));
    }

    let joined = lines.join("\n");
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(joined.as_bytes());

    let headers = reader.headers()?.clone();
    let mapping = ColumnMapping::from_headers(&headers);

    let mut rows = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        let record = result?;

        if record.len() != headers.len() {
            warn!("Skipping malformed row {}", idx + 2);
            continue;
        }

        rows.push(StatementRow {
            symbol: field(&record, mapping.symbol),
            trade_date: field(&record, mapping.trade_date),
            purchase_price: field(&record, mapping.purchase_price),
            quantity: field(&record, mapping.quantity),
        });
    }

    if rows.is_empty() {
        return Err(anyhow!("No valid data rows found in CSV"));
    }

    Ok(rows)
}

/// Convert a provider date string (YYYYMMDD) to a trade timestamp
///
/// Returns `None` for wrong length, non-numeric segments or out-of-range
/// month/day. Valid input maps to the date at 09:30:00, representing
/// market open.
pub fn parse_date_yyyymmdd(raw: &str) -> Option<NaiveDateTime> {
    if raw.len() != 8 || !raw.is_ascii() {
        return None;
    }

    let year: i32 = raw[0..4].parse().ok()?;
    let month: u32 = raw[4..6].parse().ok()?;
    let day: u32 = raw[6..8].parse().ok()?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_milli_opt(9, 30, 0, 0)
}

/// Format a trade timestamp back into the provider's YYYYMMDD form
pub fn format_date_yyyymmdd(date: NaiveDateTime) -> String {
    date.format("%Y%m%d").to_string()
}

fn positive_number(raw: &str) -> bool {
    matches!(Decimal::from_str(raw), Ok(value) if value > Decimal::ZERO)
}

/// Soft-validate a statement row
///
/// Symbol is always required. The three transaction fields are only
/// checked when at least one of them is present: a bare symbol row is
/// valid and yields a symbol-only entry.
pub fn validate_row(row: &StatementRow) -> Vec<String> {
    let mut errors = Vec::new();

    if row.symbol.is_none() {
        errors.push("Missing required field: Symbol".to_string());
    }

    let has_transaction_data =
        row.trade_date.is_some() || row.purchase_price.is_some() || row.quantity.is_some();

    if has_transaction_data {
        match &row.trade_date {
            None => errors.push("Trade Date is required when transaction data is present".to_string()),
            Some(raw) if parse_date_yyyymmdd(raw).is_none() => {
                errors.push("Invalid Trade Date format (expected YYYYMMDD)".to_string())
            }
            Some(_) => {}
        }

        match &row.purchase_price {
            None => errors
                .push("Purchase Price is required when transaction data is present".to_string()),
            Some(raw) if !positive_number(raw) => {
                errors.push("Invalid Purchase Price (must be positive number)".to_string())
            }
            Some(_) => {}
        }

        match &row.quantity {
            None => errors.push("Quantity is required when transaction data is present".to_string()),
            Some(raw) if !positive_number(raw) => {
                errors.push("Invalid Quantity (must be positive number)".to_string())
            }
            Some(_) => {}
        }
    }

    errors
}

/// Strict predicate: all three transaction fields present and valid
pub fn has_complete_transaction_data(row: &StatementRow) -> bool {
    let date_ok = row
        .trade_date
        .as_deref()
        .is_some_and(|raw| parse_date_yyyymmdd(raw).is_some());
    let price_ok = row.purchase_price.as_deref().is_some_and(positive_number);
    let quantity_ok = row.quantity.as_deref().is_some_and(positive_number);

    date_ok && price_ok && quantity_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statement_basic() {
        let text = "Symbol,Trade Date,Purchase Price,Quantity\nAAPL,20240101,100.5,10\n";
        let rows = parse_statement(text).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol.as_deref(), Some("AAPL"));
        assert_eq!(rows[0].trade_date.as_deref(), Some("20240101"));
        assert_eq!(rows[0].purchase_price.as_deref(), Some("100.5"));
        assert_eq!(rows[0].quantity.as_deref(), Some("10"));
    }

    #[test]
    fn test_parse_statement_quoted_delimiter() {
        let text = "Symbol,Trade Date,Purchase Price,Quantity\n\"BRK.B\",20240101,\"1,234.56\",10\n";
        let rows = parse_statement(text).unwrap();

        assert_eq!(rows[0].symbol.as_deref(), Some("BRK.B"));
        assert_eq!(rows[0].purchase_price.as_deref(), Some("1,234.56"));
    }

    #[test]
    fn test_parse_statement_requires_header_and_data() {
        assert!(parse_statement("").is_err());
        assert!(parse_statement("Symbol,Quantity\n").is_err());
        assert!(parse_statement("\n\n   \nSymbol,Quantity\n\n").is_err());
    }

    #[test]
    fn test_parse_statement_skips_mismatched_rows() {
        let text = "Symbol,Trade Date,Purchase Price,Quantity\nAAPL,20240101,100,10\nbadrow,only,two\nMSFT,20240102,200,5\n";
        let rows = parse_statement(text).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol.as_deref(), Some("AAPL"));
        assert_eq!(rows[1].symbol.as_deref(), Some("MSFT"));
    }

    #[test]
    fn test_parse_statement_all_rows_malformed_is_error() {
        let text = "Symbol,Trade Date,Purchase Price,Quantity\nonly,three,fields\n";
        assert!(parse_statement(text).is_err());
    }

    #[test]
    fn test_parse_statement_ignores_blank_lines() {
        let text = "Symbol,Trade Date,Purchase Price,Quantity\n\nAAPL,20240101,100,10\n\n";
        let rows = parse_statement(text).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_parse_date_valid() {
        let parsed = parse_date_yyyymmdd("20250804").unwrap();
        assert_eq!(
            parsed,
            NaiveDate::from_ymd_opt(2025, 8, 4)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_parse_date_invalid_inputs_yield_none() {
        assert_eq!(parse_date_yyyymmdd("2025130"), None); // wrong length
        assert_eq!(parse_date_yyyymmdd("abcd1234"), None); // non-numeric year
        assert_eq!(parse_date_yyyymmdd("20251345"), None); // month 13, day 45
        assert_eq!(parse_date_yyyymmdd(""), None);
        assert_eq!(parse_date_yyyymmdd("20250004"), None); // month 0
        assert_eq!(parse_date_yyyymmdd("20250100"), None); // day 0
    }

    #[test]
    fn test_parse_date_round_trip() {
        for raw in ["20240101", "20241231", "19990715"] {
            let parsed = parse_date_yyyymmdd(raw).unwrap();
            assert_eq!(format_date_yyyymmdd(parsed), raw);
        }
    }

    fn row(
        symbol: Option<&str>,
        date: Option<&str>,
        price: Option<&str>,
        quantity: Option<&str>,
    ) -> StatementRow {
        StatementRow {
            symbol: symbol.map(str::to_string),
            trade_date: date.map(str::to_string),
            purchase_price: price.map(str::to_string),
            quantity: quantity.map(str::to_string),
        }
    }

    #[test]
    fn test_validate_symbol_only_row_is_valid() {
        let errors = validate_row(&row(Some("AAPL"), None, None, None));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_validate_missing_symbol() {
        let errors = validate_row(&row(None, None, None, None));
        assert_eq!(errors, vec!["Missing required field: Symbol"]);
    }

    #[test]
    fn test_validate_partial_transaction_data_requires_all_fields() {
        // Trade Date and Purchase Price present, Quantity missing
        let errors = validate_row(&row(Some("AAPL"), Some("20240101"), Some("100"), None));
        assert_eq!(
            errors,
            vec!["Quantity is required when transaction data is present"]
        );
    }

    #[test]
    fn test_validate_bad_values() {
        let errors = validate_row(&row(
            Some("AAPL"),
            Some("2024-01-01"),
            Some("-5"),
            Some("abc"),
        ));
        assert_eq!(
            errors,
            vec![
                "Invalid Trade Date format (expected YYYYMMDD)",
                "Invalid Purchase Price (must be positive number)",
                "Invalid Quantity (must be positive number)",
            ]
        );
    }

    #[test]
    fn test_validate_complete_row() {
        let errors = validate_row(&row(Some("AAPL"), Some("20240101"), Some("100.5"), Some("10")));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_has_complete_transaction_data() {
        assert!(has_complete_transaction_data(&row(
            Some("AAPL"),
            Some("20240101"),
            Some("100"),
            Some("10")
        )));
        assert!(!has_complete_transaction_data(&row(
            Some("AAPL"),
            None,
            None,
            None
        )));
        assert!(!has_complete_transaction_data(&row(
            Some("AAPL"),
            Some("20240101"),
            Some("0"),
            Some("10")
        )));
        assert!(!has_complete_transaction_data(&row(
            Some("AAPL"),
            Some("20241345"),
            Some("100"),
            Some("10")
        )));
    }
}
