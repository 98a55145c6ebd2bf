// Import module - broker statement CSV parsing and the import pipeline

pub mod import;
pub mod statement_csv;

pub use import::{import_from_csv, ImportReport, ImportStats};
pub use statement_csv::{
    has_complete_transaction_data, parse_date_yyyymmdd, parse_statement, validate_row,
    StatementRow,
};
