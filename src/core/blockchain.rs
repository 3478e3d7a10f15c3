// The chain store: blocks live in a sled tree keyed by their hash, next to a
// single key pointing at the tip. A block and the tip move together in one
// sled transaction, so the tip never names a block that is not stored.

use crate::core::transaction::PrevTransactions;
use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::UTXOSet;
use crate::wallet::Wallet;
use data_encoding::HEXLOWER;
use log::{info, warn};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Tree};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const TIP_BLOCK_HASH_KEY: &str = "tip_block_hash";
const BLOCKS_TREE: &str = "blocks";

pub const GENESIS_COINBASE_DATA: &str = "Genesis Block";

/// Handle to a persisted chain. Clones share the database and the append lock.
#[derive(Clone)]
pub struct Blockchain {
    db: Db,
    blocks: Tree,
    // serializes every append, including the select-build-append of `send`
    append_lock: Arc<Mutex<()>>,
}

impl Blockchain {
    /// Opens the chain at `db_path`, mining a genesis block that pays
    /// `genesis_address` when the store holds no chain yet.
    pub fn open(db_path: &Path, genesis_address: &str) -> Result<Blockchain> {
        let db = sled::open(db_path)
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        Self::open_with_db(db, genesis_address)
    }

    /// Like [`Blockchain::open`] over an already opened database.
    ///
    /// Concurrent first-time callers race only inside a sled transaction that
    /// re-checks the tip, so exactly one genesis block is ever stored.
    pub fn open_with_db(db: Db, genesis_address: &str) -> Result<Blockchain> {
        let blockchain = Self::from_db(db)?;

        if blockchain.read_tip()?.is_none() {
            info!("No existing blockchain found. Mining genesis block for {genesis_address}");
            let coinbase_tx = Transaction::new_coinbase_tx(genesis_address, GENESIS_COINBASE_DATA)?;
            let genesis = Block::generate_genesis_block(&coinbase_tx)?;
            let block_data = genesis.serialize()?;
            let block_hash = genesis.get_hash();

            let created = blockchain
                .blocks
                .transaction(|tx_db| {
                    if tx_db.get(TIP_BLOCK_HASH_KEY)?.is_some() {
                        return Ok(false);
                    }
                    tx_db.insert(block_hash, block_data.as_slice())?;
                    tx_db.insert(TIP_BLOCK_HASH_KEY, block_hash)?;
                    Ok(true)
                })
                .map_err(|e: TransactionError| {
                    BlockchainError::Database(format!("Failed to store genesis block: {e}"))
                })?;
            blockchain.db.flush()?;

            if created {
                info!("Created genesis block {block_hash}");
            } else {
                info!("Genesis block was created concurrently, using existing chain");
            }
        }

        Ok(blockchain)
    }

    /// Opens an existing chain; `NotFound` when the store is empty.
    pub fn load(db_path: &Path) -> Result<Blockchain> {
        let db = sled::open(db_path)
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        let blockchain = Self::from_db(db)?;
        if blockchain.read_tip()?.is_none() {
            return Err(BlockchainError::NotFound(format!(
                "No existing blockchain at {}. Create one first.",
                db_path.display()
            )));
        }
        Ok(blockchain)
    }

    fn from_db(db: Db) -> Result<Blockchain> {
        let blocks = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open blocks tree: {e}")))?;
        Ok(Blockchain {
            db,
            blocks,
            append_lock: Arc::new(Mutex::new(())),
        })
    }

    fn read_tip(&self) -> Result<Option<String>> {
        let Some(bytes) = self
            .blocks
            .get(TIP_BLOCK_HASH_KEY)
            .map_err(|e| BlockchainError::Database(format!("Failed to get tip hash: {e}")))?
        else {
            return Ok(None);
        };
        String::from_utf8(bytes.to_vec())
            .map(Some)
            .map_err(|e| BlockchainError::Database(format!("Invalid tip hash format: {e}")))
    }

    pub fn get_db(&self) -> &Db {
        &self.db
    }

    pub fn get_tip_hash(&self) -> Result<String> {
        self.read_tip()?
            .ok_or_else(|| BlockchainError::NotFound("Chain has no tip".to_string()))
    }

    fn lock_appends(&self) -> Result<MutexGuard<'_, ()>> {
        self.append_lock
            .lock()
            .map_err(|_| BlockchainError::Database("Append lock poisoned".to_string()))
    }

    /// Verifies `transactions`, prepends a coinbase paying `miner_address`,
    /// seals the block and commits it as the new tip.
    pub fn append_block(&self, transactions: &[Transaction], miner_address: &str) -> Result<Block> {
        let _guard = self.lock_appends()?;
        self.append_block_locked(transactions, miner_address)
    }

    /// Pays `amount` from `wallet` to `to` and mines the transfer into a new
    /// block. Output selection and the append happen under one lock, so two
    /// transfers can never pick the same outputs.
    pub fn send(&self, wallet: &Wallet, to: &str, amount: u64, miner_address: &str) -> Result<Block> {
        let _guard = self.lock_appends()?;
        // I pick the outputs while holding the lock, so nothing else can spend them first
        let utxo_set = UTXOSet::new(self);
        let transaction = Transaction::new_utxo_transaction(wallet, to, amount, &utxo_set)?;
        info!(
            "Sending {amount} from {} to {to} in transaction {}",
            wallet.get_address(),
            transaction.get_id_hex()
        );
        self.append_block_locked(&[transaction], miner_address)
    }

    fn append_block_locked(&self, transactions: &[Transaction], miner_address: &str) -> Result<Block> {
        self.validate_transactions(transactions)?;

        // I read the tip from the store, never from a cached copy
        let tip_hash = self.get_tip_hash()?;
        let coinbase_tx =
            Transaction::new_coinbase_tx(miner_address, &format!("Reward for Block: {tip_hash}"))?;

        let mut block_transactions = Vec::with_capacity(transactions.len() + 1);
        block_transactions.push(coinbase_tx);
        block_transactions.extend_from_slice(transactions);

        info!(
            "Mining block on {tip_hash} with {} transactions",
            block_transactions.len()
        );
        let block = Block::new_block(tip_hash, &block_transactions)?;
        self.commit_block(&block)?;
        info!("Appended block {}", block.get_hash());

        Ok(block)
    }

    // Stores the block and moves the tip, provided the tip is still the
    // block's parent.
    fn commit_block(&self, block: &Block) -> Result<()> {
        let block_hash = block.get_hash();
        let block_data = block.serialize()?;
        let expected_tip = block.get_pre_block_hash();

        self.blocks
            .transaction(|tx_db| {
                let tip = tx_db.get(TIP_BLOCK_HASH_KEY)?;
                if tip.as_deref() != Some(expected_tip.as_bytes()) {
                    return Err(ConflictableTransactionError::Abort(()));
                }
                tx_db.insert(block_hash, block_data.as_slice())?;
                tx_db.insert(TIP_BLOCK_HASH_KEY, block_hash)?;
                Ok(())
            })
            .map_err(|e: TransactionError<()>| match e {
                TransactionError::Abort(()) => BlockchainError::Validation(format!(
                    "Chain tip moved away from {expected_tip} while mining"
                )),
                TransactionError::Storage(err) => {
                    BlockchainError::Database(format!("Failed to commit block: {err}"))
                }
            })?;

        // I flush so a committed block survives a crash right after append returns
        self.db.flush()?;
        Ok(())
    }

    fn validate_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        let mut claimed: HashSet<(Vec<u8>, i64)> = HashSet::new();

        for transaction in transactions {
            let txid = transaction.get_id_hex();
            if transaction.is_coinbase() {
                return Err(BlockchainError::Validation(format!(
                    "Coinbase transaction {txid} cannot be submitted; the miner reward is added by the chain"
                )));
            }
            if transaction.get_vin().is_empty() {
                return Err(BlockchainError::Validation(format!(
                    "Transaction {txid} has no inputs"
                )));
            }

            let prev_txs = self.resolve_inputs(transaction)?;
            if !transaction.verify(&prev_txs)? {
                warn!("Rejected transaction {txid}: signature verification failed");
                return Err(BlockchainError::Validation(format!(
                    "Transaction {txid} failed signature verification"
                )));
            }

            if transaction.get_id() != transaction.hash()?.as_slice() {
                return Err(BlockchainError::Validation(format!(
                    "Transaction {txid} ID does not match its contents"
                )));
            }

            let input_value = transaction.get_input_value(&prev_txs)?;
            let output_value = transaction.get_output_value()?;
            if input_value != output_value {
                return Err(BlockchainError::Validation(format!(
                    "Transaction {txid} spends {input_value} but creates {output_value}"
                )));
            }

            for input in transaction.get_vin() {
                if !claimed.insert((input.get_txid().to_vec(), input.get_vout())) {
                    return Err(BlockchainError::Validation(format!(
                        "Output {}:{} is spent twice in this block",
                        HEXLOWER.encode(input.get_txid()),
                        input.get_vout()
                    )));
                }
            }
        }

        if claimed.is_empty() {
            return Ok(());
        }
        let spent = self.spent_outputs()?;
        if let Some((txid, vout)) = claimed.iter().find(|outpoint| spent.contains(*outpoint)) {
            return Err(BlockchainError::Validation(format!(
                "Output {}:{vout} is already spent",
                HEXLOWER.encode(txid)
            )));
        }
        Ok(())
    }

    /// Looks up every transaction referenced by `transaction`'s inputs.
    pub fn resolve_inputs(&self, transaction: &Transaction) -> Result<PrevTransactions> {
        let mut prev_txs = PrevTransactions::new();
        for input in transaction.get_vin() {
            let txid_hex = HEXLOWER.encode(input.get_txid());
            if prev_txs.contains_key(&txid_hex) {
                continue;
            }
            let prev_tx = self.find_transaction(input.get_txid()).map_err(|e| match e {
                BlockchainError::NotFound(_) => BlockchainError::Validation(format!(
                    "Input references unknown transaction {txid_hex}"
                )),
                other => other,
            })?;
            prev_txs.insert(txid_hex, prev_tx);
        }
        Ok(prev_txs)
    }

    // Every (txid, vout) consumed by a persisted input.
    fn spent_outputs(&self) -> Result<HashSet<(Vec<u8>, i64)>> {
        let mut spent = HashSet::new();
        for block in self.iterator()? {
            for transaction in block?.get_transactions() {
                if transaction.is_coinbase() {
                    continue;
                }
                for input in transaction.get_vin() {
                    spent.insert((input.get_txid().to_vec(), input.get_vout()));
                }
            }
        }
        Ok(spent)
    }

    pub fn find_transaction(&self, txid: &[u8]) -> Result<Transaction> {
        for block in self.iterator()? {
            if let Some(transaction) = block?
                .get_transactions()
                .iter()
                .find(|transaction| transaction.get_id() == txid)
            {
                return Ok(transaction.clone());
            }
        }
        Err(BlockchainError::NotFound(format!(
            "Transaction {}",
            HEXLOWER.encode(txid)
        )))
    }

    /// Blocks from tip to genesis, starting at the tip as of this call.
    pub fn iterator(&self) -> Result<BlockchainIterator> {
        Ok(BlockchainIterator::new(self.get_tip_hash()?, self.blocks.clone()))
    }

    /// Every block, newest first.
    pub fn all_blocks(&self) -> Result<Vec<Block>> {
        self.iterator()?.collect()
    }

    pub fn get_block(&self, block_hash: &str) -> Result<Option<Block>> {
        match self
            .blocks
            .get(block_hash)
            .map_err(|e| BlockchainError::Database(format!("Failed to get block: {e}")))?
        {
            Some(block_bytes) => Ok(Some(Block::deserialize(block_bytes.as_ref())?)),
            None => Ok(None),
        }
    }

    /// Number of blocks above genesis.
    pub fn height(&self) -> Result<usize> {
        let mut count = 0usize;
        for block in self.iterator()? {
            block?;
            count += 1;
        }
        Ok(count.saturating_sub(1))
    }
}

pub struct BlockchainIterator {
    blocks: Tree,
    current_hash: Option<String>,
}

impl BlockchainIterator {
    fn new(tip_hash: String, blocks: Tree) -> BlockchainIterator {
        BlockchainIterator {
            blocks,
            current_hash: Some(tip_hash),
        }
    }

    fn load(&self, hash: &str) -> Result<Block> {
        let data = self
            .blocks
            .get(hash)
            .map_err(|e| BlockchainError::Database(format!("Failed to get block: {e}")))?
            .ok_or_else(|| BlockchainError::Database(format!("Block {hash} is missing")))?;
        Block::deserialize(data.as_ref())
    }
}

impl Iterator for BlockchainIterator {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.current_hash.take()?;
        match self.load(&hash) {
            Ok(block) => {
                if !block.is_genesis() {
                    self.current_hash = Some(block.get_pre_block_hash().to_string());
                }
                Some(Ok(block))
            }
            // stop after reporting a broken link
            Err(e) => Some(Err(e)),
        }
    }
}
