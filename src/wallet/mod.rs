//! Key pairs and addresses
//!
//! A wallet is a P-256 key pair; its address is the hex SHA-256 of the raw
//! public key coordinates.

#[allow(clippy::module_inception)]
pub mod wallet;
pub mod wallets;

pub use wallet::{derive_address, validate_address, Wallet, ADDRESS_LEN};
pub use wallets::{Wallets, WALLET_FILE};
