//! Hashing, signing and encoding helpers used throughout the ledger.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify, new_key_pair, raw_public_key,
    sha256_digest, RAW_PUBLIC_KEY_LEN, SIGNATURE_LEN,
};

pub use serialization::{deserialize, serialize};
