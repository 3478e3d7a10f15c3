use crate::error::Result;
use crate::utils::{new_key_pair, raw_public_key, sha256_digest};
use data_encoding::HEXLOWER;

/// Length of an address: hex of a SHA-256 digest
pub const ADDRESS_LEN: usize = 64;

#[derive(Clone, bincode::Encode, bincode::Decode)]
pub struct Wallet {
    pkcs8: Vec<u8>,
    public_key: Vec<u8>, // raw X || Y
}

impl Wallet {
    pub fn new() -> Result<Wallet> {
        let pkcs8 = new_key_pair()?;
        let public_key = raw_public_key(&pkcs8)?;
        Ok(Wallet { pkcs8, public_key })
    }

    pub fn get_address(&self) -> String {
        derive_address(self.public_key.as_slice())
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        self.pkcs8.as_slice()
    }
}

// Keep private key material out of debug output
impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.get_address())
            .finish_non_exhaustive()
    }
}

/// Address of a raw public key: lowercase hex of its SHA-256 digest.
pub fn derive_address(pub_key: &[u8]) -> String {
    HEXLOWER.encode(sha256_digest(pub_key).as_slice())
}

pub fn validate_address(address: &str) -> bool {
    address.len() == ADDRESS_LEN
        && address
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
