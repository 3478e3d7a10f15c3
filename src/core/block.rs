use crate::core::{ProofOfWork, Transaction, DIFFICULTY};
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize};
use log::info;

#[derive(Debug, Clone, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct Block {
    transactions: Vec<Transaction>, // coinbase first
    hash: String,
    pre_block_hash: String, // empty for genesis
    nonce: i64,
}

impl Block {
    /// Builds a block on top of `pre_block_hash` and seals it with proof-of-work.
    pub fn new_block(pre_block_hash: String, transactions: &[Transaction]) -> Result<Block> {
        match transactions.first() {
            None => {
                return Err(BlockchainError::Validation(
                    "Block must contain at least one transaction".to_string(),
                ))
            }
            Some(first) if !first.is_coinbase() => {
                return Err(BlockchainError::Validation(
                    "First transaction of a block must be a coinbase".to_string(),
                ))
            }
            Some(_) => {}
        }

        let mut block = Block {
            transactions: transactions.to_vec(),
            hash: String::new(),
            pre_block_hash,
            nonce: 0,
        };

        let (nonce, hash) = ProofOfWork::new_proof_of_work(&block, DIFFICULTY).run();
        block.nonce = nonce;
        block.hash = hash;
        info!(
            "Sealed block {} with nonce {} ({} transactions)",
            block.hash,
            block.nonce,
            block.transactions.len()
        );

        Ok(block)
    }

    pub fn generate_genesis_block(transaction: &Transaction) -> Result<Block> {
        Block::new_block(String::new(), std::slice::from_ref(transaction))
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_pre_block_hash(&self) -> &str {
        self.pre_block_hash.as_str()
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_nonce(&self) -> i64 {
        self.nonce
    }

    pub fn is_genesis(&self) -> bool {
        self.pre_block_hash.is_empty()
    }

    /// Concatenated transaction IDs in block order.
    pub fn transaction_ids(&self) -> Vec<u8> {
        let mut txids = vec![];
        for transaction in &self.transactions {
            txids.extend(transaction.get_id());
        }
        txids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coinbase(data: &str) -> Transaction {
        Transaction::new_coinbase_tx("A", data).unwrap()
    }

    #[test]
    fn test_genesis_block_is_sealed() {
        let block = Block::generate_genesis_block(&coinbase("Genesis Block")).unwrap();
        assert!(block.is_genesis());
        assert!(block.get_hash().starts_with(&"0".repeat(DIFFICULTY as usize)));
        assert!(ProofOfWork::validate(&block, DIFFICULTY));
    }

    #[test]
    fn test_empty_block_rejected() {
        let result = Block::new_block("prev".to_string(), &[]);
        assert!(matches!(result, Err(BlockchainError::Validation(_))));
    }

    #[test]
    fn test_block_must_start_with_coinbase() {
        let tx = Transaction::new(vec![], vec![]).unwrap();
        let result = Block::new_block("prev".to_string(), &[tx, coinbase("x")]);
        assert!(matches!(result, Err(BlockchainError::Validation(_))));
    }

    #[test]
    fn test_serialization_round_trip() {
        let block = Block::new_block("00ff".to_string(), &[coinbase("x")]).unwrap();
        let bytes = block.serialize().unwrap();
        let decoded = Block::deserialize(&bytes).unwrap();

        assert_eq!(decoded, block);
        assert_eq!(decoded.get_hash(), block.get_hash());
        assert_eq!(decoded.get_pre_block_hash(), "00ff");
        assert_eq!(decoded.get_nonce(), block.get_nonce());
        assert_eq!(decoded.serialize().unwrap(), bytes);
    }

    #[test]
    fn test_transaction_ids_concatenate_in_order() {
        let first = coinbase("one");
        let block = Block::new_block(String::new(), &[first.clone()]).unwrap();
        assert_eq!(block.transaction_ids(), first.get_id().to_vec());
    }
}
