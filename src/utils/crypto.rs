use ring::digest::{Context, SHA256};
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, KeyPair, UnparsedPublicKey, ECDSA_P256_SHA256_FIXED,
    ECDSA_P256_SHA256_FIXED_SIGNING,
};

use crate::error::{BlockchainError, Result};

/// Length of a raw P-256 public key (`X || Y`, no SEC1 tag byte)
pub const RAW_PUBLIC_KEY_LEN: usize = 64;
/// Length of a fixed-width P-256 signature (`r || s`)
pub const SIGNATURE_LEN: usize = 64;

const SEC1_UNCOMPRESSED_TAG: u8 = 0x04;

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

pub fn new_key_pair() -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
        .map_err(|e| BlockchainError::Crypto(format!("Failed to generate ECDSA key pair: {e}")))?
        .as_ref()
        .to_vec();
    Ok(pkcs8)
}

/// Returns the raw `X || Y` coordinates of the key pair stored in `pkcs8`.
pub fn raw_public_key(pkcs8: &[u8]) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
        .map_err(|e| {
            BlockchainError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
        })?;
    let sec1 = key_pair.public_key().as_ref();
    if sec1.len() != RAW_PUBLIC_KEY_LEN + 1 || sec1[0] != SEC1_UNCOMPRESSED_TAG {
        return Err(BlockchainError::Crypto(
            "Unexpected public key encoding".to_string(),
        ));
    }
    Ok(sec1[1..].to_vec())
}

/// Signs `message` (hashed with SHA-256 by ring) and returns `r || s`.
pub fn ecdsa_p256_sha256_sign_digest(pkcs8: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
        .map_err(|e| {
            BlockchainError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
        })?;
    let signature = key_pair
        .sign(&rng, message)
        .map_err(|e| BlockchainError::Crypto(format!("Failed to sign message: {e}")))?
        .as_ref()
        .to_vec();
    Ok(signature)
}

/// Verifies an `r || s` signature against a raw `X || Y` public key.
pub fn ecdsa_p256_sha256_sign_verify(public_key: &[u8], signature: &[u8], message: &[u8]) -> bool {
    if public_key.len() != RAW_PUBLIC_KEY_LEN || signature.len() != SIGNATURE_LEN {
        return false;
    }
    // split at the midpoint: first half X, second half Y
    let (x, y) = public_key.split_at(public_key.len() / 2);
    let mut sec1 = Vec::with_capacity(RAW_PUBLIC_KEY_LEN + 1);
    sec1.push(SEC1_UNCOMPRESSED_TAG);
    sec1.extend_from_slice(x);
    sec1.extend_from_slice(y);

    let peer_public_key = UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, sec1);
    peer_public_key.verify(message, signature).is_ok()
}
