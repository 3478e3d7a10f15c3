// Transactions move value by consuming earlier outputs and creating new ones.
// Every non-coinbase input is signed separately over a trimmed copy of the
// transaction that names the exact output it claims.

use crate::error::{BlockchainError, Result};
use crate::storage::UTXOSet;
use crate::utils::{
    deserialize, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify, serialize,
    sha256_digest,
};
use crate::wallet::{derive_address, Wallet};
use data_encoding::HEXLOWER;
use std::collections::HashMap;

/// Reward minted by every coinbase transaction
pub const SUBSIDY: u64 = 50;
/// Output index carried by the single coinbase input
pub const COINBASE_VOUT: i64 = -1;

/// Previous transactions referenced by a transaction's inputs, keyed by hex txid.
pub type PrevTransactions = HashMap<String, Transaction>;

#[derive(Debug, Clone, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct TXInput {
    txid: Vec<u8>,      // transaction holding the claimed output
    vout: i64,          // index of the claimed output, -1 for coinbase
    signature: Vec<u8>, // r || s
    pub_key: Vec<u8>,   // spender's raw X || Y key, or free data on a coinbase
}

impl TXInput {
    pub fn new(txid: &[u8], vout: usize, pub_key: &[u8]) -> TXInput {
        TXInput {
            txid: txid.to_vec(),
            vout: vout as i64,
            signature: vec![],
            pub_key: pub_key.to_vec(),
        }
    }

    pub fn get_txid(&self) -> &[u8] {
        self.txid.as_slice()
    }

    pub fn get_vout(&self) -> i64 {
        self.vout
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature.as_slice()
    }

    pub fn get_pub_key(&self) -> &[u8] {
        self.pub_key.as_slice()
    }

    /// Output index as usize; `None` for the coinbase sentinel.
    pub fn output_index(&self) -> Option<usize> {
        usize::try_from(self.vout).ok()
    }

    /// Whether this input was authored by the holder of `address`.
    pub fn uses_key(&self, address: &str) -> bool {
        !self.pub_key.is_empty() && derive_address(self.pub_key.as_slice()) == address
    }
}

#[derive(Debug, Clone, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct TXOutput {
    value: u64,
    pub_key: Vec<u8>, // owner address bytes
}

impl TXOutput {
    pub fn new(value: u64, address: &str) -> TXOutput {
        TXOutput {
            value,
            pub_key: address.as_bytes().to_vec(),
        }
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_pub_key(&self) -> &[u8] {
        self.pub_key.as_slice()
    }

    pub fn get_owner(&self) -> String {
        String::from_utf8_lossy(&self.pub_key).into_owned()
    }

    pub fn is_locked_with_key(&self, address: &str) -> bool {
        self.pub_key.as_slice() == address.as_bytes()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    id: Vec<u8>,
    vin: Vec<TXInput>,
    vout: Vec<TXOutput>,
}

impl Transaction {
    /// Builds a transaction from finalized inputs and outputs and sets its ID.
    pub fn new(vin: Vec<TXInput>, vout: Vec<TXOutput>) -> Result<Transaction> {
        let mut tx = Transaction {
            id: vec![],
            vin,
            vout,
        };
        tx.id = tx.hash()?;
        Ok(tx)
    }

    /// Mints [`SUBSIDY`] to `to`. `data` fills the input's key slot so that
    /// coinbases of different blocks get different IDs.
    pub fn new_coinbase_tx(to: &str, data: &str) -> Result<Transaction> {
        if to.is_empty() {
            return Err(BlockchainError::InvalidAddress(
                "Coinbase recipient must not be empty".to_string(),
            ));
        }
        let tx_input = TXInput {
            txid: vec![],
            vout: COINBASE_VOUT,
            signature: vec![],
            pub_key: data.as_bytes().to_vec(),
        };
        Transaction::new(vec![tx_input], vec![TXOutput::new(SUBSIDY, to)])
    }

    /// Spends outputs of `wallet` to pay `amount` to `to`, returning change to
    /// the wallet's own address. The result is signed and carries its final ID.
    pub fn new_utxo_transaction(
        wallet: &Wallet,
        to: &str,
        amount: u64,
        utxo_set: &UTXOSet,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(BlockchainError::Validation(
                "Amount must be positive".to_string(),
            ));
        }
        if to.is_empty() {
            return Err(BlockchainError::InvalidAddress(
                "Recipient must not be empty".to_string(),
            ));
        }

        let from = wallet.get_address();
        let (accumulated, valid_outputs) = utxo_set.find_spendable_outputs(&from, amount)?;
        if accumulated < amount {
            return Err(BlockchainError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let inputs = valid_outputs
            .iter()
            .map(|out| TXInput::new(&out.txid, out.vout, wallet.get_public_key()))
            .collect();

        let mut outputs = vec![TXOutput::new(amount, to)];
        if accumulated > amount {
            outputs.push(TXOutput::new(accumulated - amount, &from));
        }

        let mut tx = Transaction::new(inputs, outputs)?;
        let prev_txs = utxo_set.get_blockchain().resolve_inputs(&tx)?;
        tx.sign(wallet.get_pkcs8(), &prev_txs)?;
        Ok(tx)
    }

    pub fn is_coinbase(&self) -> bool {
        self.vin.len() == 1 && self.vin[0].txid.is_empty() && self.vin[0].vout == COINBASE_VOUT
    }

    /// SHA-256 of the canonical encoding with the ID cleared.
    pub fn hash(&self) -> Result<Vec<u8>> {
        let tx_copy = Transaction {
            id: vec![],
            vin: self.vin.clone(),
            vout: self.vout.clone(),
        };
        Ok(sha256_digest(&tx_copy.serialize()?))
    }

    /// Copy with every input's signature and public key cleared.
    pub fn trimmed_copy(&self) -> Transaction {
        let inputs = self
            .vin
            .iter()
            .map(|input| TXInput {
                txid: input.txid.clone(),
                vout: input.vout,
                signature: vec![],
                pub_key: vec![],
            })
            .collect();
        Transaction {
            id: self.id.clone(),
            vin: inputs,
            vout: self.vout.clone(),
        }
    }

    /// The output claimed by `input`, looked up in `prev_txs`.
    pub fn referenced_output<'a>(
        input: &TXInput,
        prev_txs: &'a PrevTransactions,
    ) -> Result<&'a TXOutput> {
        let txid_hex = HEXLOWER.encode(input.get_txid());
        let prev_tx = prev_txs.get(&txid_hex).ok_or_else(|| {
            BlockchainError::Validation(format!("Previous transaction {txid_hex} not resolved"))
        })?;
        input
            .output_index()
            .and_then(|idx| prev_tx.vout.get(idx))
            .ok_or_else(|| {
                BlockchainError::Validation(format!(
                    "Output {txid_hex}:{} does not exist",
                    input.get_vout()
                ))
            })
    }

    /// Message signed by input `index`: the ID of the trimmed copy whose slot
    /// `index` carries the owner of the output being claimed. Sign and verify
    /// both go through here.
    pub fn signing_message(&self, index: usize, prev_txs: &PrevTransactions) -> Result<Vec<u8>> {
        let input = self.vin.get(index).ok_or_else(|| {
            BlockchainError::Validation(format!("Input index {index} out of range"))
        })?;
        let prev_output = Self::referenced_output(input, prev_txs)?;

        let mut tx_copy = self.trimmed_copy();
        tx_copy.vin[index].pub_key = prev_output.pub_key.clone();
        tx_copy.hash()
    }

    /// Signs every input and then refreshes the ID so it covers the signatures.
    pub fn sign(&mut self, pkcs8: &[u8], prev_txs: &PrevTransactions) -> Result<()> {
        if self.is_coinbase() {
            return Ok(());
        }

        let mut signatures = Vec::with_capacity(self.vin.len());
        for idx in 0..self.vin.len() {
            let message = self.signing_message(idx, prev_txs)?;
            signatures.push(ecdsa_p256_sha256_sign_digest(pkcs8, &message)?);
        }
        for (vin, signature) in self.vin.iter_mut().zip(signatures) {
            vin.signature = signature;
        }

        self.id = self.hash()?;
        Ok(())
    }

    /// Checks every input's signature and that the signing key owns the
    /// claimed output. Unresolvable references are errors, not `false`.
    pub fn verify(&self, prev_txs: &PrevTransactions) -> Result<bool> {
        if self.is_coinbase() {
            return Ok(true);
        }
        if self.vin.is_empty() {
            return Ok(false);
        }

        for (idx, vin) in self.vin.iter().enumerate() {
            let prev_output = Self::referenced_output(vin, prev_txs)?;
            if !prev_output.is_locked_with_key(&derive_address(vin.get_pub_key())) {
                log::warn!(
                    "Input {idx} of {} claims an output it does not own",
                    HEXLOWER.encode(&self.id)
                );
                return Ok(false);
            }

            let message = self.signing_message(idx, prev_txs)?;
            if !ecdsa_p256_sha256_sign_verify(vin.get_pub_key(), vin.get_signature(), &message)
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn get_input_value(&self, prev_txs: &PrevTransactions) -> Result<u64> {
        if self.is_coinbase() {
            return Ok(0);
        }
        let mut total = 0u64;
        for vin in &self.vin {
            let value = Self::referenced_output(vin, prev_txs)?.get_value();
            total = total
                .checked_add(value)
                .ok_or_else(|| BlockchainError::Validation("Input value overflow".to_string()))?;
        }
        Ok(total)
    }

    pub fn get_output_value(&self) -> Result<u64> {
        let mut total = 0u64;
        for vout in &self.vout {
            total = total
                .checked_add(vout.get_value())
                .ok_or_else(|| BlockchainError::Validation("Output value overflow".to_string()))?;
        }
        Ok(total)
    }

    pub fn get_id(&self) -> &[u8] {
        self.id.as_slice()
    }

    pub fn get_id_hex(&self) -> String {
        HEXLOWER.encode(&self.id)
    }

    pub fn get_vin(&self) -> &[TXInput] {
        self.vin.as_slice()
    }

    pub fn get_vout(&self) -> &[TXOutput] {
        self.vout.as_slice()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }

    #[cfg(test)]
    pub(crate) fn input_mut(&mut self, index: usize) -> &mut TXInput {
        &mut self.vin[index]
    }

    #[cfg(test)]
    pub(crate) fn set_signature(input: &mut TXInput, signature: Vec<u8>) {
        input.signature = signature;
    }
}
