use crate::core::Block;
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use log::debug;
use num_bigint::BigUint;
use std::ops::ShlAssign;

/// Number of leading zero hex characters a block hash must have
pub const DIFFICULTY: u32 = 2;

const MAX_DIFFICULTY: u32 = 64;

/// Seals a block: `hash = SHA256(tx ids || pre_block_hash || nonce)`, searched
/// from nonce 0 until the hex digest starts with `difficulty` zeros.
pub struct ProofOfWork<'a> {
    block: &'a Block,
    target: BigUint,
}

impl<'a> ProofOfWork<'a> {
    pub fn new_proof_of_work(block: &'a Block, difficulty: u32) -> ProofOfWork<'a> {
        // `d` leading zero hex digits <=> digest < 2^(256 - 4d)
        let difficulty = difficulty.min(MAX_DIFFICULTY);
        let mut target = BigUint::from(1u32);
        target.shl_assign(256 - 4 * difficulty as usize);
        ProofOfWork { block, target }
    }

    /// Recomputes the digest of a sealed block and checks it against both the
    /// stored hash and the target.
    pub fn validate(block: &Block, difficulty: u32) -> bool {
        let pow = ProofOfWork::new_proof_of_work(block, difficulty);
        let hash = sha256_digest(pow.prepare_data(block.get_nonce()).as_slice());
        HEXLOWER.encode(&hash) == block.get_hash() && pow.meets_target(&hash)
    }

    fn meets_target(&self, hash: &[u8]) -> bool {
        BigUint::from_bytes_be(hash) < self.target
    }

    fn prepare_data(&self, nonce: i64) -> Vec<u8> {
        let mut data_bytes = self.block.transaction_ids();
        data_bytes.extend(self.block.get_pre_block_hash().as_bytes());
        data_bytes.extend(nonce.to_be_bytes());
        data_bytes
    }

    /// Linear search from nonce 0; returns the winning nonce and hex digest.
    pub fn run(&self) -> (i64, String) {
        let mut nonce = 0i64;
        loop {
            let hash = sha256_digest(self.prepare_data(nonce).as_slice());
            if self.meets_target(&hash) {
                let hash_hex = HEXLOWER.encode(hash.as_slice());
                debug!("Found nonce {nonce}: {hash_hex}");
                return (nonce, hash_hex);
            }
            nonce += 1;
        }
    }
}
