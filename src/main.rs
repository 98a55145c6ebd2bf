use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rust_decimal::Decimal;
use tabled::{settings::Style, Table, Tabled};

use stockfolio::db::{self, Transaction, TransactionType};
use stockfolio::importers::{self, statement_csv};
use stockfolio::performance;
use stockfolio::quotes::{FileQuoteProvider, QuoteProvider};

#[derive(Parser)]
#[command(name = "stockfolio")]
#[command(version, about = "Investment portfolio tracker with FIFO lot matching")]
struct Cli {
    /// Database file (defaults to ~/.stockfolio/data.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a broker statement CSV into a new portfolio
    Import {
        /// Path to the CSV file
        file: String,

        /// Name for the new portfolio
        #[arg(short, long)]
        name: String,

        /// Preview only, don't save to database
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Portfolio management and viewing
    Portfolio {
        #[command(subcommand)]
        action: PortfolioCommands,
    },

    /// Manual transaction entry
    Tx {
        #[command(subcommand)]
        action: TxCommands,
    },
}

#[derive(Subcommand)]
enum PortfolioCommands {
    /// List all portfolios
    List,

    /// Show per-symbol and portfolio performance
    Show {
        /// Portfolio name or id
        portfolio: String,

        /// JSON file with quote snapshots (array of {symbol, close, ...})
        #[arg(long)]
        quotes: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum TxCommands {
    /// Add a buy or sell transaction
    Add {
        /// Portfolio name or id
        portfolio: String,
        /// Instrument symbol
        symbol: String,
        /// Transaction type: buy or sell
        #[arg(long = "type")]
        tx_type: String,
        /// Quantity (positive)
        #[arg(long)]
        amount: String,
        /// Unit price (positive)
        #[arg(long)]
        price: String,
        /// Trade date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
    },

    /// List transactions for a symbol
    List {
        portfolio: String,
        symbol: String,
    },

    /// Remove a transaction by id
    Remove {
        portfolio: String,
        symbol: String,
        id: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Import {
            file,
            name,
            dry_run,
        } => handle_import(cli.db, &file, &name, dry_run),
        Commands::Portfolio { action } => match action {
            PortfolioCommands::List => handle_portfolio_list(cli.db),
            PortfolioCommands::Show { portfolio, quotes } => {
                handle_portfolio_show(cli.db, &portfolio, quotes.as_deref())
            }
        },
        Commands::Tx { action } => handle_tx(cli.db, action),
    }
}

fn open(db_path: Option<PathBuf>) -> Result<rusqlite::Connection> {
    db::init_database(db_path.clone())?;
    db::open_db(db_path)
}

fn handle_import(db_path: Option<PathBuf>, file: &str, name: &str, dry_run: bool) -> Result<()> {
    let csv_text =
        std::fs::read_to_string(file).context(format!("Failed to read CSV file: {}", file))?;

    if dry_run {
        let rows = statement_csv::parse_statement(&csv_text)?;
        let mut valid = 0;
        let mut transactions = 0;
        for (index, row) in rows.iter().enumerate() {
            let errors = statement_csv::validate_row(row);
            if errors.is_empty() {
                valid += 1;
                if statement_csv::has_complete_transaction_data(row) {
                    transactions += 1;
                }
            } else {
                println!("  Row {}: {}", index + 2, errors.join(", ").yellow());
            }
        }
        println!(
            "\n{} Dry run: {} valid rows, {} transactions - no changes saved",
            "ℹ".blue().bold(),
            valid,
            transactions
        );
        return Ok(());
    }

    let conn = open(db_path)?;
    let report = importers::import_from_csv(&conn, &csv_text, name);

    for error in &report.errors {
        println!("  {}", error.yellow());
    }

    if !report.success {
        println!("\n{} Import failed", "✗".red().bold());
        return Err(anyhow!("import failed"));
    }

    println!("\n{} Import complete!", "✓".green().bold());
    println!("  Symbols:  {}", report.stats.symbols.to_string().cyan());
    println!(
        "  Imported: {}",
        report.stats.transactions.to_string().green()
    );
    if report.stats.skipped > 0 {
        println!("  Skipped:  {}", report.stats.skipped.to_string().yellow());
    }

    Ok(())
}

fn handle_portfolio_list(db_path: Option<PathBuf>) -> Result<()> {
    let conn = open(db_path)?;
    let portfolios = db::list_portfolios(&conn)?;

    if portfolios.is_empty() {
        println!("No portfolios yet. Import a statement or add one manually.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct PortfolioRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Symbols")]
        symbols: String,
        #[tabled(rename = "Id")]
        id: String,
    }

    let rows: Vec<PortfolioRow> = portfolios
        .iter()
        .map(|p| PortfolioRow {
            name: p.name.clone(),
            symbols: p.symbols.join(", "),
            id: p.id.clone(),
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()).to_string());
    Ok(())
}

fn format_metric(value: Option<Decimal>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

fn handle_portfolio_show(
    db_path: Option<PathBuf>,
    portfolio: &str,
    quotes_file: Option<&std::path::Path>,
) -> Result<()> {
    let conn = open(db_path)?;
    let portfolio = db::get_portfolio(&conn, portfolio)?;
    let transactions = db::load_transactions(&conn, &portfolio.id)?;

    let quotes = match quotes_file {
        Some(path) => FileQuoteProvider::load(path)?.fetch_quotes(&portfolio.symbols)?,
        None => Default::default(),
    };

    let report = performance::evaluate_portfolio(&portfolio.symbols, &transactions, &quotes);

    #[derive(Tabled)]
    struct SymbolRow {
        #[tabled(rename = "Symbol")]
        symbol: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Cost")]
        cost: String,
        #[tabled(rename = "Today")]
        today: String,
        #[tabled(rename = "Today %")]
        today_percent: String,
        #[tabled(rename = "Total")]
        total: String,
        #[tabled(rename = "Total %")]
        total_percent: String,
        #[tabled(rename = "Realized")]
        realized: String,
        #[tabled(rename = "All-time")]
        alltime: String,
    }

    let rows: Vec<SymbolRow> = report
        .symbols
        .iter()
        .map(|(symbol, result)| SymbolRow {
            symbol: symbol.clone(),
            value: format_metric(result.value),
            cost: format!("{:.2}", result.cost),
            today: format_metric(result.today),
            today_percent: format_metric(result.today_percent),
            total: format_metric(result.total),
            total_percent: format_metric(result.total_percent),
            realized: format_metric(result.realized),
            alltime: format_metric(result.alltime),
        })
        .collect();

    println!("\nPortfolio: {}", portfolio.name.bold());
    println!("{}", Table::new(rows).with(Style::rounded()).to_string());

    let summary = &report.summary;
    let today_str = format!("{:.2} ({:.2} %)", summary.today_total, summary.today_percent);
    let total_str = format!("{:.2} ({:.2} %)", summary.total, summary.total_percent);
    let colorize = |value: Decimal, text: String| {
        if value >= Decimal::ZERO {
            text.green()
        } else {
            text.red()
        }
    };
    println!(
        "\n  Today: {}    Total: {}",
        colorize(summary.today_total, today_str),
        colorize(summary.total, total_str)
    );

    Ok(())
}

fn handle_tx(db_path: Option<PathBuf>, action: TxCommands) -> Result<()> {
    let conn = open(db_path)?;

    match action {
        TxCommands::Add {
            portfolio,
            symbol,
            tx_type,
            amount,
            price,
            date,
        } => {
            let portfolio = db::get_portfolio(&conn, &portfolio)?;
            let tx_type = tx_type
                .parse::<TransactionType>()
                .map_err(|_| anyhow!("Invalid transaction type: {} (use buy or sell)", tx_type))?;
            let amount =
                Decimal::from_str(&amount).map_err(|_| anyhow!("Invalid amount: {}", amount))?;
            let price =
                Decimal::from_str(&price).map_err(|_| anyhow!("Invalid price: {}", price))?;
            let date = chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .map_err(|_| anyhow!("Invalid date: {} (use YYYY-MM-DD)", date))?
                .and_hms_opt(9, 30, 0)
                .expect("market open time is valid");

            let tx = Transaction::new(tx_type, amount, price, date);
            tx.validate().map_err(|message| anyhow!(message))?;
            db::save_transaction(&conn, &portfolio.id, &symbol, &tx)?;

            println!("{} Added transaction {}", "✓".green().bold(), tx.id);
            Ok(())
        }

        TxCommands::List { portfolio, symbol } => {
            let portfolio = db::get_portfolio(&conn, &portfolio)?;
            let transactions = db::load_transactions_for_symbol(&conn, &portfolio.id, &symbol)?;

            #[derive(Tabled)]
            struct TxRow {
                #[tabled(rename = "Date")]
                date: String,
                #[tabled(rename = "Type")]
                tx_type: String,
                #[tabled(rename = "Amount")]
                amount: String,
                #[tabled(rename = "Price")]
                price: String,
                #[tabled(rename = "Id")]
                id: String,
            }

            let rows: Vec<TxRow> = transactions
                .iter()
                .map(|tx| TxRow {
                    date: tx.date.format("%Y-%m-%d").to_string(),
                    tx_type: tx.tx_type.as_str().to_string(),
                    amount: tx.amount.to_string(),
                    price: tx.price.to_string(),
                    id: tx.id.clone(),
                })
                .collect();

            println!("{}", Table::new(rows).with(Style::rounded()).to_string());
            Ok(())
        }

        TxCommands::Remove {
            portfolio,
            symbol,
            id,
        } => {
            let portfolio = db::get_portfolio(&conn, &portfolio)?;
            db::remove_transaction(&conn, &portfolio.id, &symbol, &id)?;
            println!("{} Removed transaction {}", "✓".green().bold(), id);
            Ok(())
        }
    }
}
