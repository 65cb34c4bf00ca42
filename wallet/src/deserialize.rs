// SPDX-License-Identifier: CC0-1.0

//! Structured view of a raw transaction, with addresses resolved and the
//! canonical unsigned form attached.

use coldwallet_network::Protocol;
use serde_json::json;

use crate::amount::Amount;
use crate::error::DecodeResult;
use crate::script::script_to_address;
use crate::transaction::{Transaction, Txid};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeserializedInput {
    pub txid: Txid,
    pub vout: u32,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
    /// Present only for inputs spending through a witness.
    pub witness: Option<Vec<Vec<u8>>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeserializedOutput {
    pub amount: Amount,
    pub script_pubkey: Vec<u8>,
    pub address: String,
}

/// A decoded transaction as seen by the integrity checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeserializedTx {
    pub txid: Txid,
    pub version: i32,
    pub lock_time: u32,
    pub witness_size: usize,
    pub inputs: Vec<DeserializedInput>,
    pub outputs: Vec<DeserializedOutput>,
    /// Hex of the canonical unsigned serialization.
    pub unsigned_hex: String,
}

impl DeserializedTx {
    pub fn from_hex(tx_hex: &str, proto: &Protocol) -> DecodeResult<Self> {
        DeserializedTx::from_bytes(&hex::decode(tx_hex)?, proto)
    }

    /// Decodes and classifies every output. Unknown output scripts are an
    /// error.
    pub fn from_bytes(bytes: &[u8], proto: &Protocol) -> DecodeResult<Self> {
        let decoded = Transaction::decode(bytes)?;
        let tx = decoded.tx;
        let txid = tx.txid();

        let outputs = tx
            .output
            .into_iter()
            .map(|o| {
                Ok(DeserializedOutput {
                    amount: Amount::from_sat(o.value),
                    address: script_to_address(&o.script_pubkey, proto)?,
                    script_pubkey: o.script_pubkey,
                })
            })
            .collect::<DecodeResult<Vec<_>>>()?;

        let inputs = tx
            .input
            .into_iter()
            .map(|i| DeserializedInput {
                txid: i.previous_output.txid,
                vout: i.previous_output.vout,
                script_sig: i.script_sig,
                sequence: i.sequence,
                witness: (!i.witness.is_empty()).then_some(i.witness),
            })
            .collect();

        Ok(DeserializedTx {
            txid,
            version: tx.version,
            lock_time: tx.lock_time,
            witness_size: decoded.witness_size,
            inputs,
            outputs,
            unsigned_hex: hex::encode(decoded.unsigned),
        })
    }

    /// JSON rendering in the daemon's field naming.
    pub fn to_json(&self, proto: &Protocol) -> serde_json::Value {
        let inputs: Vec<_> = self
            .inputs
            .iter()
            .map(|i| {
                let mut v = json!({
                    "txid": i.txid.to_string(),
                    "vout": i.vout,
                    "scriptSig": hex::encode(&i.script_sig),
                    "nSeq": format!("{:08x}", i.sequence),
                });
                if let Some(w) = &i.witness {
                    v["witness"] = w.iter().map(hex::encode).collect();
                }
                v
            })
            .collect();
        let outputs: Vec<_> = self
            .outputs
            .iter()
            .map(|o| {
                json!({
                    "amount": o.amount.to_json(proto.decimals()),
                    "scriptPubKey": hex::encode(&o.script_pubkey),
                    "address": o.address,
                })
            })
            .collect();
        json!({
            "txid": self.txid.to_string(),
            "version": self.version,
            "lock_time": self.lock_time,
            "witness_size": self.witness_size,
            "num_txins": self.inputs.len(),
            "txins": inputs,
            "num_txouts": self.outputs.len(),
            "txouts": outputs,
            "unsigned_hex": self.unsigned_hex,
        })
    }
}
