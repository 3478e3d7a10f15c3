//! Core ledger functionality
//!
//! Blocks, transactions, proof-of-work sealing and the persisted chain.

pub mod block;
pub mod blockchain;
pub mod proof_of_work;
pub mod transaction;

pub use block::Block;
pub use blockchain::{Blockchain, BlockchainIterator, GENESIS_COINBASE_DATA};
pub use proof_of_work::{ProofOfWork, DIFFICULTY};
pub use transaction::{PrevTransactions, TXInput, TXOutput, Transaction, COINBASE_VOUT, SUBSIDY};
