//! Ledger integration tests
//!
//! End-to-end scenarios over an on-disk chain: genesis bootstrap, transfers,
//! rejected appends and the chain-wide invariants every persisted block keeps.

use pow_ledger::core::GENESIS_COINBASE_DATA;
use pow_ledger::{
    Block, Blockchain, BlockchainError, ProofOfWork, TXInput, TXOutput, Transaction, UTXOSet,
    Wallet, DIFFICULTY, SUBSIDY,
};
use std::collections::HashSet;
use tempfile::{tempdir, TempDir};

fn chain_paying(address: &str) -> (Blockchain, TempDir) {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("chain");
    let blockchain = Blockchain::open(&db_path, address).unwrap();
    (blockchain, temp_dir)
}

fn balance(blockchain: &Blockchain, address: &str) -> u64 {
    UTXOSet::new(blockchain).get_balance(address).unwrap()
}

// Builds and signs a transfer without appending it.
fn signed_transfer(blockchain: &Blockchain, from: &Wallet, to: &str, amount: u64) -> Transaction {
    let utxo_set = UTXOSet::new(blockchain);
    Transaction::new_utxo_transaction(from, to, amount, &utxo_set).unwrap()
}

fn assert_chain_invariants(blockchain: &Blockchain) {
    let blocks = blockchain.all_blocks().unwrap();
    let mut claimed = HashSet::new();

    for block in &blocks {
        assert!(ProofOfWork::validate(block, DIFFICULTY));
        assert!(block.get_hash().starts_with(&"0".repeat(DIFFICULTY as usize)));
        assert!(block.get_transactions()[0].is_coinbase());

        let decoded = Block::deserialize(&block.serialize().unwrap()).unwrap();
        assert_eq!(&decoded, block);

        for tx in block.get_transactions() {
            assert_eq!(tx.get_id(), tx.hash().unwrap().as_slice());
            if tx.is_coinbase() {
                continue;
            }
            let prev_txs = blockchain.resolve_inputs(tx).unwrap();
            assert!(tx.verify(&prev_txs).unwrap());
            for input in tx.get_vin() {
                assert!(claimed.insert((input.get_txid().to_vec(), input.get_vout())));
            }
        }
    }

    assert!(blocks.last().unwrap().get_pre_block_hash().is_empty());
}

#[test]
fn test_genesis_only_balance() {
    let (blockchain, _dir) = chain_paying("A");
    assert_eq!(balance(&blockchain, "A"), 50);
    assert_chain_invariants(&blockchain);
}

#[test]
fn test_reopen_keeps_chain() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("chain");
    let tip = {
        let blockchain = Blockchain::open(&db_path, "A").unwrap();
        blockchain.append_block(&[], "A").unwrap();
        blockchain.get_tip_hash().unwrap()
    };

    let reopened = Blockchain::load(&db_path).unwrap();
    assert_eq!(reopened.get_tip_hash().unwrap(), tip);
    assert_eq!(balance(&reopened, "A"), 100);

    let genesis = reopened.all_blocks().unwrap().pop().unwrap();
    assert_eq!(
        genesis.get_transactions()[0].get_vin()[0].get_pub_key(),
        GENESIS_COINBASE_DATA.as_bytes()
    );
}

#[test]
fn test_load_without_chain_is_not_found() {
    let temp_dir = tempdir().unwrap();
    let result = Blockchain::load(&temp_dir.path().join("empty"));
    assert!(matches!(result, Err(BlockchainError::NotFound(_))));
}

#[test]
fn test_send_with_sender_mining() {
    let alice = Wallet::new().unwrap();
    let bob = Wallet::new().unwrap();
    let (blockchain, _dir) = chain_paying(&alice.get_address());

    let block = blockchain
        .send(&alice, &bob.get_address(), 20, &alice.get_address())
        .unwrap();

    assert_eq!(block.get_transactions().len(), 2);
    assert_eq!(blockchain.get_tip_hash().unwrap(), block.get_hash());
    assert_eq!(balance(&blockchain, &alice.get_address()), 50 - 20 + 50);
    assert_eq!(balance(&blockchain, &bob.get_address()), 20);
    assert_chain_invariants(&blockchain);
}

#[test]
fn test_chained_transfers() {
    let alice = Wallet::new().unwrap();
    let bob = Wallet::new().unwrap();
    let carol = Wallet::new().unwrap();
    let (blockchain, _dir) = chain_paying(&alice.get_address());

    blockchain
        .send(&alice, &bob.get_address(), 30, "miner")
        .unwrap();
    blockchain
        .send(&bob, &carol.get_address(), 25, "miner")
        .unwrap();
    blockchain
        .send(&alice, &carol.get_address(), 20, "miner")
        .unwrap();

    assert_eq!(balance(&blockchain, &alice.get_address()), 0);
    assert_eq!(balance(&blockchain, &bob.get_address()), 5);
    assert_eq!(balance(&blockchain, &carol.get_address()), 45);
    assert_eq!(balance(&blockchain, "miner"), 3 * SUBSIDY);
    assert_eq!(blockchain.height().unwrap(), 3);
    assert_chain_invariants(&blockchain);
}

#[test]
fn test_insufficient_funds_leaves_tip() {
    let alice = Wallet::new().unwrap();
    let bob = Wallet::new().unwrap();
    let (blockchain, _dir) = chain_paying(&bob.get_address());

    // alice ends up with 10
    blockchain
        .send(&bob, &alice.get_address(), 10, &bob.get_address())
        .unwrap();
    assert_eq!(balance(&blockchain, &alice.get_address()), 10);
    let tip = blockchain.get_tip_hash().unwrap();

    let result = blockchain.send(&alice, &bob.get_address(), 20, &alice.get_address());
    assert_eq!(
        result.unwrap_err(),
        BlockchainError::InsufficientFunds {
            required: 20,
            available: 10
        }
    );
    assert_eq!(blockchain.get_tip_hash().unwrap(), tip);
    assert_eq!(balance(&blockchain, &alice.get_address()), 10);
}

#[test]
fn test_zero_amount_rejected() {
    let alice = Wallet::new().unwrap();
    let (blockchain, _dir) = chain_paying(&alice.get_address());
    let result = blockchain.send(&alice, "B", 0, "B");
    assert!(matches!(result, Err(BlockchainError::Validation(_))));
}

#[test]
fn test_tampered_signature_aborts_append() {
    let alice = Wallet::new().unwrap();
    let bob = Wallet::new().unwrap();
    let (blockchain, _dir) = chain_paying(&alice.get_address());
    let tip = blockchain.get_tip_hash().unwrap();

    let tx = signed_transfer(&blockchain, &alice, &bob.get_address(), 20);
    let tampered = flip_signature_byte(&tx);
    let prev_txs = blockchain.resolve_inputs(&tampered).unwrap();
    assert!(tx.verify(&prev_txs).unwrap());
    assert!(!tampered.verify(&prev_txs).unwrap());

    let result = blockchain.append_block(&[tampered], &alice.get_address());
    assert!(matches!(result, Err(BlockchainError::Validation(_))));
    assert_eq!(blockchain.get_tip_hash().unwrap(), tip);
    assert_eq!(balance(&blockchain, &alice.get_address()), 50);
    assert_eq!(balance(&blockchain, &bob.get_address()), 0);
}

// Re-encodes `tx` with one byte of the first input's signature flipped.
fn flip_signature_byte(tx: &Transaction) -> Transaction {
    let mut bytes = tx.serialize().unwrap();
    let signature = tx.get_vin()[0].get_signature();
    let start = bytes
        .windows(signature.len())
        .position(|window| window == signature)
        .unwrap();
    bytes[start + 5] ^= 0x01;
    let tampered = Transaction::deserialize(&bytes).unwrap();
    assert_ne!(tampered.get_vin()[0].get_signature(), signature);
    tampered
}

#[test]
fn test_double_spend_rejected() {
    let alice = Wallet::new().unwrap();
    let bob = Wallet::new().unwrap();
    let carol = Wallet::new().unwrap();
    let (blockchain, _dir) = chain_paying(&alice.get_address());

    // both spend the genesis output
    let to_bob = signed_transfer(&blockchain, &alice, &bob.get_address(), 20);
    let to_carol = signed_transfer(&blockchain, &alice, &carol.get_address(), 20);
    let tip = blockchain.get_tip_hash().unwrap();

    let same_block = blockchain.append_block(&[to_bob.clone(), to_carol.clone()], "miner");
    assert!(matches!(same_block, Err(BlockchainError::Validation(_))));
    assert_eq!(blockchain.get_tip_hash().unwrap(), tip);

    blockchain.append_block(&[to_bob], "miner").unwrap();
    let later_block = blockchain.append_block(&[to_carol], "miner");
    assert!(matches!(later_block, Err(BlockchainError::Validation(_))));

    assert_eq!(balance(&blockchain, &bob.get_address()), 20);
    assert_eq!(balance(&blockchain, &carol.get_address()), 0);
    assert_chain_invariants(&blockchain);
}

#[test]
fn test_unknown_input_reference_rejected() {
    let alice = Wallet::new().unwrap();
    let (blockchain, _dir) = chain_paying(&alice.get_address());
    let tip = blockchain.get_tip_hash().unwrap();

    let input = TXInput::new(&[7u8; 32], 0, alice.get_public_key());
    let tx = Transaction::new(vec![input], vec![TXOutput::new(10, "B")]).unwrap();

    let result = blockchain.append_block(&[tx], "miner");
    assert!(matches!(result, Err(BlockchainError::Validation(_))));
    assert_eq!(blockchain.get_tip_hash().unwrap(), tip);
}

#[test]
fn test_value_must_balance() {
    let alice = Wallet::new().unwrap();
    let (blockchain, _dir) = chain_paying(&alice.get_address());
    let genesis_tx = blockchain.all_blocks().unwrap()[0].get_transactions()[0].clone();

    // claims the 50 coin output but creates 60
    let input = TXInput::new(genesis_tx.get_id(), 0, alice.get_public_key());
    let mut tx = Transaction::new(vec![input], vec![TXOutput::new(60, "B")]).unwrap();
    let prev_txs = blockchain.resolve_inputs(&tx).unwrap();
    tx.sign(alice.get_pkcs8(), &prev_txs).unwrap();
    assert!(tx.verify(&prev_txs).unwrap());

    let result = blockchain.append_block(&[tx], "miner");
    assert!(matches!(result, Err(BlockchainError::Validation(_))));
    assert_eq!(balance(&blockchain, "B"), 0);
}

#[test]
fn test_concurrent_sends_never_double_spend() {
    let alice = Wallet::new().unwrap();
    let bob = Wallet::new().unwrap();
    let (blockchain, _dir) = chain_paying(&alice.get_address());

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let blockchain = blockchain.clone();
            let alice = alice.clone();
            let to = bob.get_address();
            std::thread::spawn(move || blockchain.send(&alice, &to, 40, "miner"))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // only 50 was available: exactly one transfer of 40 can succeed
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(BlockchainError::InsufficientFunds { .. })
    )));
    assert_eq!(balance(&blockchain, &bob.get_address()), 40);
    assert_eq!(balance(&blockchain, &alice.get_address()), 10);
    assert_chain_invariants(&blockchain);
}
