// Database module - SQLite connection and models

pub mod models;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

pub use models::{Portfolio, Transaction, TransactionType};

/// Get the default database path (~/.stockfolio/data.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let data_dir = PathBuf::from(home).join(".stockfolio");

    // Create directory if it doesn't exist
    std::fs::create_dir_all(&data_dir).context("Failed to create .stockfolio directory")?;

    Ok(data_dir.join("data.db"))
}

/// Open database connection
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = db_path.unwrap_or(get_default_db_path()?);
    let conn = Connection::open(&path).context(format!("Failed to open database at {:?}", path))?;

    // Enable foreign keys
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("Failed to enable foreign keys")?;

    Ok(conn)
}

/// Initialize the database with schema
///
/// Creates the database file and runs the schema SQL to set up all
/// tables and indexes.
pub fn init_database(db_path: Option<PathBuf>) -> Result<()> {
    let path = db_path.unwrap_or(get_default_db_path()?);

    info!("Initializing database at: {:?}", path);

    let conn = open_db(Some(path))?;

    let schema_sql = include_str!("schema.sql");

    conn.execute_batch(schema_sql)
        .context("Failed to execute schema")?;

    Ok(())
}

/// Create a new portfolio owning the given distinct symbol list
pub fn create_portfolio(conn: &Connection, name: &str, symbols: &[String]) -> Result<Portfolio> {
    let portfolio = Portfolio {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        symbols: symbols.to_vec(),
    };

    conn.execute(
        "INSERT INTO portfolios (id, name) VALUES (?1, ?2)",
        params![portfolio.id, portfolio.name],
    )
    .context("Failed to create portfolio")?;

    for (position, symbol) in portfolio.symbols.iter().enumerate() {
        conn.execute(
            "INSERT INTO portfolio_symbols (portfolio_id, symbol, position) VALUES (?1, ?2, ?3)",
            params![portfolio.id, symbol, position as i64],
        )
        .context("Failed to register portfolio symbol")?;
    }

    info!(
        "Created portfolio '{}' with {} symbols",
        portfolio.name,
        portfolio.symbols.len()
    );

    Ok(portfolio)
}

/// List all portfolios with their symbols
pub fn list_portfolios(conn: &Connection) -> Result<Vec<Portfolio>> {
    let mut stmt = conn.prepare("SELECT id, name FROM portfolios ORDER BY created_at, name")?;
    let idents = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut portfolios = Vec::with_capacity(idents.len());
    for (id, name) in idents {
        let symbols = load_symbols(conn, &id)?;
        portfolios.push(Portfolio { id, name, symbols });
    }

    Ok(portfolios)
}

/// Look up a portfolio by id or, failing that, by exact name
pub fn get_portfolio(conn: &Connection, id_or_name: &str) -> Result<Portfolio> {
    let ident: Option<(String, String)> = conn
        .query_row(
            "SELECT id, name FROM portfolios WHERE id = ?1 OR name = ?1",
            [id_or_name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (id, name) = ident.ok_or_else(|| anyhow!("Portfolio not found: {}", id_or_name))?;
    let symbols = load_symbols(conn, &id)?;

    Ok(Portfolio { id, name, symbols })
}

fn load_symbols(conn: &Connection, portfolio_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT symbol FROM portfolio_symbols WHERE portfolio_id = ?1 ORDER BY position",
    )?;
    let symbols = stmt
        .query_map([portfolio_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(symbols)
}

/// Load all transactions for a portfolio, grouped by symbol
///
/// Transactions come back sorted ascending by date (ties keep insertion
/// order), which is the order the lot-matching engine expects.
pub fn load_transactions(
    conn: &Connection,
    portfolio_id: &str,
) -> Result<BTreeMap<String, Vec<Transaction>>> {
    let mut stmt = conn.prepare(
        "SELECT symbol, id, tx_type, amount, price, date
         FROM transactions
         WHERE portfolio_id = ?1
         ORDER BY symbol, date ASC, rowid ASC",
    )?;

    let mut rows = stmt.query([portfolio_id])?;
    let mut by_symbol: BTreeMap<String, Vec<Transaction>> = BTreeMap::new();

    while let Some(row) = rows.next()? {
        let symbol: String = row.get(0)?;
        let tx = read_transaction(row)?;
        by_symbol.entry(symbol).or_default().push(tx);
    }

    Ok(by_symbol)
}

/// Load the transactions for one (portfolio, symbol) pair, date ascending
pub fn load_transactions_for_symbol(
    conn: &Connection,
    portfolio_id: &str,
    symbol: &str,
) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT symbol, id, tx_type, amount, price, date
         FROM transactions
         WHERE portfolio_id = ?1 AND symbol = ?2
         ORDER BY date ASC, rowid ASC",
    )?;

    let mut rows = stmt.query(params![portfolio_id, symbol])?;
    let mut transactions = Vec::new();

    while let Some(row) = rows.next()? {
        transactions.push(read_transaction(row)?);
    }

    Ok(transactions)
}

fn read_transaction(row: &Row) -> Result<Transaction> {
    let id: String = row.get(1)?;
    let tx_type_raw: String = row.get(2)?;
    let amount_raw: String = row.get(3)?;
    let price_raw: String = row.get(4)?;
    let date: NaiveDateTime = row.get(5)?;

    let tx_type = tx_type_raw
        .parse::<TransactionType>()
        .map_err(|_| anyhow!("Unknown transaction type '{}'", tx_type_raw))?;
    let amount =
        Decimal::from_str(&amount_raw).context("Failed to parse transaction amount")?;
    let price = Decimal::from_str(&price_raw).context("Failed to parse transaction price")?;

    Ok(Transaction {
        id,
        tx_type,
        amount,
        price,
        date,
    })
}

/// Save a transaction for a (portfolio, symbol) pair, upserting by id
pub fn save_transaction(
    conn: &Connection,
    portfolio_id: &str,
    symbol: &str,
    tx: &Transaction,
) -> Result<()> {
    conn.execute(
        "INSERT INTO transactions (id, portfolio_id, symbol, tx_type, amount, price, date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
             tx_type = excluded.tx_type,
             amount = excluded.amount,
             price = excluded.price,
             date = excluded.date",
        params![
            tx.id,
            portfolio_id,
            symbol,
            tx.tx_type.as_str(),
            tx.amount.to_string(),
            tx.price.to_string(),
            tx.date,
        ],
    )
    .context("Failed to save transaction")?;

    Ok(())
}

/// Remove a transaction by id
pub fn remove_transaction(
    conn: &Connection,
    portfolio_id: &str,
    symbol: &str,
    transaction_id: &str,
) -> Result<()> {
    conn.execute(
        "DELETE FROM transactions WHERE id = ?1 AND portfolio_id = ?2 AND symbol = ?3",
        params![transaction_id, portfolio_id, symbol],
    )
    .context("Failed to remove transaction")?;

    Ok(())
}
