//! Configuration management
//!
//! Where the chain and wallets live on disk and who receives block rewards.

pub mod settings;

pub use settings::{Config, DEFAULT_CONFIG_FILE};
