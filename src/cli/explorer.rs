// Renders blocks for `printchain`, either as text or as JSON.
use crate::core::{Block, Transaction};
use crate::wallet::derive_address;
use data_encoding::HEXLOWER;
use serde_json::{json, Value};
use std::fmt::{self, Write};

fn transaction_json(tx: &Transaction) -> Value {
    let inputs: Vec<Value> = if tx.is_coinbase() {
        vec![]
    } else {
        tx.get_vin()
            .iter()
            .map(|input| {
                json!({
                    "txid": HEXLOWER.encode(input.get_txid()),
                    "vout": input.get_vout(),
                    "from": derive_address(input.get_pub_key()),
                    "signature": HEXLOWER.encode(input.get_signature()),
                })
            })
            .collect()
    };
    let outputs: Vec<Value> = tx
        .get_vout()
        .iter()
        .map(|output| json!({ "value": output.get_value(), "to": output.get_owner() }))
        .collect();

    json!({
        "id": tx.get_id_hex(),
        "coinbase": tx.is_coinbase(),
        "inputs": inputs,
        "outputs": outputs,
    })
}

pub fn block_json(block: &Block) -> Value {
    json!({
        "hash": block.get_hash(),
        "prev_hash": block.get_pre_block_hash(),
        "nonce": block.get_nonce(),
        "transactions": block.get_transactions().iter().map(transaction_json).collect::<Vec<_>>(),
    })
}

pub fn blocks_json(blocks: &[Block]) -> Value {
    Value::Array(blocks.iter().map(block_json).collect())
}

pub fn block_text(block: &Block) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "Pre block hash: {}", block.get_pre_block_hash())?;
    writeln!(out, "Cur block hash: {}", block.get_hash())?;
    writeln!(out, "Nonce: {}", block.get_nonce())?;
    for tx in block.get_transactions() {
        writeln!(out, "- Transaction txid_hex: {}", tx.get_id_hex())?;
        if !tx.is_coinbase() {
            for input in tx.get_vin() {
                writeln!(
                    out,
                    "-- Input txid = {}, vout = {}, from = {}",
                    HEXLOWER.encode(input.get_txid()),
                    input.get_vout(),
                    derive_address(input.get_pub_key()),
                )?;
            }
        }
        for output in tx.get_vout() {
            writeln!(
                out,
                "-- Output value = {}, to = {}",
                output.get_value(),
                output.get_owner()
            )?;
        }
    }
    Ok(out)
}
