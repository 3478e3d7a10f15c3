//! Error handling for the ledger
//!
//! Every fallible operation returns [`BlockchainError`]. Validation and storage
//! failures during an append abort before the tip moves; read-path failures are
//! reported without touching the chain.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// The persistent store could not complete an operation
    Database(String),
    /// Key generation, signing or key parsing failed
    Crypto(String),
    /// Encoding or decoding of blocks/transactions failed
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Configuration file or environment problems
    Config(String),
    /// A transaction failed verification or references something it must not
    Validation(String),
    /// Spendable outputs fall short of the requested amount
    InsufficientFunds { required: u64, available: u64 },
    /// A requested transaction, block or chain does not exist
    NotFound(String),
    /// Invalid address format
    InvalidAddress(String),
    /// Wallet lookup or persistence errors
    Wallet(String),
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::Database(msg) => write!(f, "Database error: {msg}"),
            BlockchainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Validation(msg) => write!(f, "Validation failed: {msg}"),
            BlockchainError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            BlockchainError::NotFound(what) => write!(f, "Not found: {what}"),
            BlockchainError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            BlockchainError::Wallet(msg) => write!(f, "Wallet error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<sled::Error> for BlockchainError {
    fn from(err: sled::Error) -> Self {
        BlockchainError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}
