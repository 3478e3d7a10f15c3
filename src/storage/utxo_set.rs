use crate::core::{Blockchain, TXOutput, Transaction};
use crate::error::Result;
use data_encoding::HEXLOWER;
use std::collections::{HashMap, HashSet};

/// Reference to one output of a persisted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub txid: Vec<u8>,
    pub vout: usize,
}

/// An unspent output together with where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    pub outpoint: OutPoint,
    pub output: TXOutput,
}

/// Resolves unspent outputs by replaying the persisted chain.
///
/// Nothing is cached: each call walks the chain from the current tip, so the
/// answer always matches what is stored at call time.
pub struct UTXOSet<'a> {
    blockchain: &'a Blockchain,
}

impl<'a> UTXOSet<'a> {
    pub fn new(blockchain: &'a Blockchain) -> UTXOSet<'a> {
        UTXOSet { blockchain }
    }

    pub fn get_blockchain(&self) -> &Blockchain {
        self.blockchain
    }

    // Walks tip -> genesis, visiting each block's transactions last-to-first
    // so that a spend is always seen before the output it consumes.
    fn scan(&self, address: &str) -> Result<Vec<(Transaction, Vec<usize>)>> {
        let mut unspent = vec![];
        let mut spent_txos: HashMap<String, Vec<usize>> = HashMap::new();

        for block in self.blockchain.iterator()? {
            let block = block?;
            for tx in block.get_transactions().iter().rev() {
                let spent = spent_txos.get(&tx.get_id_hex());
                let indices: Vec<usize> = tx
                    .get_vout()
                    .iter()
                    .enumerate()
                    .filter(|(idx, out)| {
                        out.is_locked_with_key(address)
                            && !spent.is_some_and(|outs| outs.contains(idx))
                    })
                    .map(|(idx, _)| idx)
                    .collect();
                if !indices.is_empty() {
                    unspent.push((tx.clone(), indices));
                }

                if tx.is_coinbase() {
                    continue;
                }
                for txin in tx.get_vin() {
                    if !txin.uses_key(address) {
                        continue;
                    }
                    if let Some(vout) = txin.output_index() {
                        spent_txos
                            .entry(HEXLOWER.encode(txin.get_txid()))
                            .or_default()
                            .push(vout);
                    }
                }
            }
        }
        Ok(unspent)
    }

    /// Transactions holding at least one unspent output owned by `address`,
    /// each listed once, newest first.
    pub fn find_unspent_transactions(&self, address: &str) -> Result<Vec<Transaction>> {
        Ok(self.scan(address)?.into_iter().map(|(tx, _)| tx).collect())
    }

    /// Unspent outputs owned by `address` in scan order.
    pub fn find_utxo(&self, address: &str) -> Result<Vec<UnspentOutput>> {
        let mut utxos = vec![];
        for (tx, indices) in self.scan(address)? {
            for idx in indices {
                utxos.push(UnspentOutput {
                    outpoint: OutPoint {
                        txid: tx.get_id().to_vec(),
                        vout: idx,
                    },
                    output: tx.get_vout()[idx].clone(),
                });
            }
        }
        Ok(utxos)
    }

    pub fn get_balance(&self, address: &str) -> Result<u64> {
        Ok(self
            .find_utxo(address)?
            .iter()
            .map(|utxo| utxo.output.get_value())
            .sum())
    }

    /// Greedily picks unspent outputs in scan order until `amount` is covered.
    /// When funds run out the partial selection is returned; callers decide
    /// whether it is enough.
    pub fn find_spendable_outputs(&self, address: &str, amount: u64) -> Result<(u64, Vec<OutPoint>)> {
        let mut accumulated = 0u64;
        let mut unspent_outputs = vec![];

        for utxo in self.find_utxo(address)? {
            if accumulated >= amount {
                break;
            }
            accumulated = accumulated.saturating_add(utxo.output.get_value());
            unspent_outputs.push(utxo.outpoint);
        }
        Ok((accumulated, unspent_outputs))
    }

    /// Number of distinct transactions that still hold unspent outputs of `address`.
    pub fn count_transactions(&self, address: &str) -> Result<usize> {
        let txids: HashSet<Vec<u8>> = self
            .find_utxo(address)?
            .into_iter()
            .map(|utxo| utxo.outpoint.txid)
            .collect();
        Ok(txids.len())
    }
}
