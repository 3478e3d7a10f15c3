//! # pow-ledger
//!
//! A single-node ledger: an append-only chain of proof-of-work sealed blocks,
//! value tracked as unspent transaction outputs, transfers authorized with
//! ECDSA P-256 signatures.
//!
//! ## Layout
//! - `core/`: blocks, transactions and their signing protocol, proof-of-work, the chain store
//! - `storage/`: unspent-output resolution by replaying the chain
//! - `wallet/`: key pairs and addresses
//! - `config/`: where data lives and who gets rewards
//! - `utils/`: hashing, signing and canonical encoding
//! - `cli/`: the command-line request surface
//!
//! ## Invariants worth remembering
//! - A transaction ID is the SHA-256 of its canonical encoding with the ID cleared.
//! - A block hash covers its transaction IDs, the previous hash and the nonce.
//! - Block bytes and the tip pointer are committed in one sled transaction.
//! - All appends go through one lock; `send` holds it from output selection to commit.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;
pub mod wallet;

pub use cli::{Command, Opt};
pub use config::Config;
pub use core::{
    Block, Blockchain, BlockchainIterator, PrevTransactions, ProofOfWork, TXInput, TXOutput,
    Transaction, COINBASE_VOUT, DIFFICULTY, SUBSIDY,
};
pub use error::{BlockchainError, Result};
pub use storage::{OutPoint, UTXOSet, UnspentOutput};
pub use utils::{
    ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify, new_key_pair, sha256_digest,
};
pub use wallet::{derive_address, validate_address, Wallet, Wallets};
