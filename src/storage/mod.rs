//! Chain-state queries
//!
//! Unspent outputs are derived by replaying the persisted chain on demand.

pub mod utxo_set;

pub use utxo_set::{OutPoint, UTXOSet, UnspentOutput};
