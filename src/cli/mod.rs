//! Command-line interface
//!
//! The request surface over the ledger: balances, transfers, wallets and the
//! block explorer.

pub mod commands;
pub mod explorer;

pub use commands::{Command, Opt};
pub use explorer::{block_json, block_text, blocks_json};
