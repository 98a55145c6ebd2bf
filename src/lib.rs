//! Stockfolio - investment portfolio tracker
//!
//! This library provides functionality for tracking investment portfolios:
//! importing buy/sell transactions from CSV statements, storing them per
//! portfolio and symbol, and computing realized/unrealized performance
//! using FIFO lot matching against a current market quote.

pub mod db;
pub mod error;
pub mod importers;
pub mod performance;
pub mod quotes;
