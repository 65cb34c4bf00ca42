// SPDX-License-Identifier: CC0-1.0

//! Transaction operations that need a daemon: raw transaction creation,
//! signing, broadcast and status queries.
//!
//! Every hex string the daemon returns is decoded independently and checked
//! against the wallet's own model before it is accepted.

use std::fmt;

use coldwallet::integrity::check_hex_matches;
use coldwallet::{Amount, DeserializedTx, Tx, TxError, TxState, Txid};
use coldwallet_rpc_json::{
    CreateRawTransactionInput, DecodeRawTransactionResult, GetMempoolEntryResult, GetRawTransactionVerboseResult,
    GetTransactionResult, SignRawTransactionInput, SignRawTransactionResult,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value, json};

use crate::bitcoin::BitcoinRpcClient;
use crate::call_sigs::ICall;
use crate::client::Capability;
use crate::error::{Error, Result, RpcError, RpcResult};

/// Where a sent or signed transaction stands according to the daemon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    /// Waiting in the mempool.
    InMempool,
    /// Mined, with this many confirmations.
    Confirmed(u64),
    /// Mined, but not known to the tracking wallet.
    InBlockchainNotWallet,
    /// Conflicted out by a replacement, which may itself be confirmed.
    Replaced {
        confirmed: bool,
    },
    /// Unknown to the daemon.
    NotFound,
}

impl TxStatus {
    /// Whether a transaction in this state must not be broadcast again.
    pub fn blocks_send(self) -> bool {
        !matches!(self, TxStatus::InMempool | TxStatus::NotFound)
    }

    /// Process exit status for this state when it ends a command.
    pub fn exit_code(self) -> i32 {
        match self {
            TxStatus::InBlockchainNotWallet => 2,
            TxStatus::Replaced {
                ..
            } => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TxStatus::InMempool => write!(f, "Transaction is in mempool"),
            TxStatus::Confirmed(1) => write!(f, "Transaction has 1 confirmation"),
            TxStatus::Confirmed(n) => write!(f, "Transaction has {} confirmations", n),
            TxStatus::InBlockchainNotWallet => {
                write!(f, "ERROR: transaction is in the blockchain (but not in the tracking wallet)!")
            }
            TxStatus::Replaced {
                confirmed: false,
            } => write!(f, "Transaction has been replaced!"),
            TxStatus::Replaced {
                confirmed: true,
            } => write!(f, "Transaction has been replaced, and the replacement TX is confirmed!"),
            TxStatus::NotFound => write!(f, "Transaction not found in mempool or blockchain"),
        }
    }
}

fn amount_number(amount: Amount, decimals: u32) -> Result<Number> {
    match amount.to_json(decimals) {
        Value::Number(n) => Ok(n),
        other => Err(RpcError::failure(format!("{}: amount not representable as a JSON number", other)).into()),
    }
}

/// Asks the daemon for the unsigned hex of `tx` and records it.
///
/// The transaction is stamped with the current time and block count.
pub async fn create_raw(tx: &mut Tx, rpc: &BitcoinRpcClient) -> Result<()> {
    let first = tx.inputs.first().ok_or(TxError::Empty("inputs"))?;
    let first_sequence = first.sequence;
    let decimals = tx.decimals();

    let inputs: Vec<CreateRawTransactionInput> = tx
        .inputs
        .iter()
        .enumerate()
        .map(|(n, i)| CreateRawTransactionInput {
            txid: i.txid.to_string(),
            vout: i.vout,
            sequence: if n == 0 { first_sequence } else { None },
        })
        .collect();

    let mut outputs = Map::new();
    for o in &tx.outputs {
        outputs.insert(o.addr.clone(), Value::Number(amount_number(o.amount, decimals)?));
    }

    let mut params = vec![serde_json::to_value(&inputs).map_err(RpcError::from)?, Value::Object(outputs)];
    if let Some(locktime) = tx.locktime {
        params.push(json!(locktime));
    }

    let hex: String = rpc.call_as("createrawtransaction", Value::Array(params)).await?;
    tx.set_raw_hex(&hex)?;
    tx.add_timestamp();
    tx.blockcount = rpc.blockcount;
    tracing::debug!("Created raw transaction {}", tx.txid.as_ref().map(|t| t.as_str()).unwrap_or_default());
    Ok(())
}

/// The daemon's minimum relay fee per kB.
pub async fn get_relay_fee(rpc: &BitcoinRpcClient) -> Result<Amount> {
    let info: coldwallet_rpc_json::GetNetworkInfoResult = rpc.call_as("getnetworkinfo", json!([])).await?;
    Ok(Amount::from_json(&Value::Number(info.relay_fee), rpc.proto().decimals())?)
}

/// Signs `tx` with the given WIF keys.
///
/// On success the transaction is in the signed state, its signed hex has
/// passed the integrity checks and the daemon agrees on its txid.
pub async fn sign(tx: &mut Tx, rpc: &BitcoinRpcClient, keys: &[String]) -> Result<()> {
    if tx.state() != TxState::Unsigned {
        return Err(Error::Sign("Transaction is already signed!".to_string()));
    }
    tx.check_chain(&rpc.chain)?;

    let proto = *tx.proto();
    if (tx.has_segwit_inputs() || tx.has_segwit_outputs()) && !proto.supports_segwit() {
        return Err(TxError::SegwitUnsupported(proto.coin().symbol().to_string()).into());
    }

    let decimals = tx.decimals();
    let prevtxs = tx
        .inputs
        .iter()
        .map(|i| {
            Ok(SignRawTransactionInput {
                txid: i.txid.to_string(),
                vout: i.vout,
                script_pub_key: hex::encode(&i.script_pubkey),
                // P2SH-P2WPKH redeem scripts are derived by the daemon from
                // the supplied keys
                redeem_script: None,
                amount: amount_number(i.amount, decimals)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(
        "Passing {} key{} to {}",
        keys.len(),
        if keys.len() == 1 { "" } else { "s" },
        rpc.daemon().coind_name()
    );

    let call = ICall::SignRawTransaction {
        hex: &tx.hex,
        keys,
        prevtxs: serde_json::to_value(&prevtxs).map_err(RpcError::from)?,
        sighash_type: proto.sighash_type(),
        with_key: rpc.has_cap(Capability::SignWithKey),
    };
    let ret = match rpc.icall(&call).await {
        Ok(ret) => ret,
        Err(e) => return Err(Error::Sign(sign_failure_hint(&e))),
    };
    let ret: SignRawTransactionResult = serde_json::from_value(ret).map_err(RpcError::from)?;

    if !ret.complete {
        let errors: Vec<String> = ret.errors.iter().map(|e| format!("{}:{}: {}", e.txid, e.vout, e.error)).collect();
        return Err(Error::Sign(format!(
            "{} returned the following errors:\n{}",
            rpc.daemon().coind_name(),
            errors.join("\n")
        )));
    }

    let signed_hex = hex::encode(&ret.hex);
    tracing::debug!("Signed transaction size: {}", ret.hex.len());
    tx.accept_signed_hex(&signed_hex)?;

    let decoded: DecodeRawTransactionResult = rpc.call_as("decoderawtransaction", json!([signed_hex])).await?;
    tx.verify_coin_txid(&decoded.txid.parse::<Txid>()?, "after signing")?;
    Ok(())
}

fn sign_failure_hint(e: &RpcError) -> String {
    match e.failure_message() {
        Some(m) if m.contains("Invalid sighash param") => {
            "This is not the BCH chain.\nRe-run the script without the --coin=bch option.".to_string()
        }
        _ => e.to_string(),
    }
}

fn send_failure_hint(e: &RpcError) -> String {
    match e.failure_message() {
        Some(m) if m.contains("Signature must use SIGHASH_FORKID") => {
            "The Aug. 1 2017 UAHF has activated on this chain.\nRe-run the script with the --coin=bch option."
                .to_string()
        }
        Some(m) if m.contains("Illegal use of SIGHASH_FORKID") => {
            "The Aug. 1 2017 UAHF is not yet active on this chain.\nRe-run the script without the --coin=bch option."
                .to_string()
        }
        _ => e.to_string(),
    }
}

/// Runs every check that must pass before `tx` is broadcast.
///
/// A transaction the daemon already knows as mined or replaced yields
/// [`Error::Status`]. A mempool hit is returned as a status so the caller
/// can warn about it.
pub async fn check_sendable(tx: &Tx, rpc: &BitcoinRpcClient) -> Result<TxStatus> {
    if tx.state() != TxState::Signed {
        return Err(Error::Send("Transaction is not signed!".to_string()));
    }
    tx.check_chain(&rpc.chain)?;

    let dt = DeserializedTx::from_hex(&tx.hex, tx.proto())?;
    check_hex_matches(tx, &dt)?;

    if tx.has_segwit_outputs() && !rpc.segwit_is_active() {
        return Err(Error::SegwitInactive);
    }
    tx.check_max_fee()?;

    let status = get_status(tx, rpc).await?;
    if status.blocks_send() {
        return Err(Error::Status(status));
    }
    if status == TxStatus::InMempool {
        tracing::warn!("Warning: transaction is in mempool!");
    }
    Ok(status)
}

/// Submits a signed transaction and moves it to the sent state once the
/// daemon returns the expected txid.
pub async fn broadcast(tx: &mut Tx, rpc: &BitcoinRpcClient) -> Result<Txid> {
    tracing::info!("Sending transaction");
    let ret = match rpc.call("sendrawtransaction", json!([tx.hex])).await {
        Ok(ret) => ret,
        Err(e) => {
            let wallet_txid = tx.txid.as_ref().map(|t| t.to_string()).unwrap_or_default();
            tracing::error!("Send of transaction {} failed", wallet_txid);
            return Err(Error::Send(send_failure_hint(&e)));
        }
    };
    let daemon_txid: String = serde_json::from_value(ret).map_err(RpcError::from)?;
    let daemon_txid: Txid = daemon_txid.parse()?;

    let blockcount: u64 = rpc.call_as("getblockcount", json!([])).await?;
    tx.mark_sent(&daemon_txid, blockcount)?;
    tracing::info!("Transaction sent: {}", daemon_txid);
    Ok(daemon_txid)
}

/// [`check_sendable`] followed by [`broadcast`].
pub async fn send(tx: &mut Tx, rpc: &BitcoinRpcClient) -> Result<Txid> {
    check_sendable(tx, rpc).await?;
    broadcast(tx, rpc).await
}

/// Daemon query whose failure means "not there".
async fn query<T: DeserializeOwned + Default>(rpc: &BitcoinRpcClient, method: &str, params: Value) -> RpcResult<T> {
    match rpc.call_as(method, params).await {
        Err(RpcError::Failure {
            ..
        }) => Ok(T::default()),
        other => other,
    }
}

/// Looks `tx` up in the mempool, the tracking wallet and the chain.
pub async fn get_status(tx: &Tx, rpc: &BitcoinRpcClient) -> Result<TxStatus> {
    let Some(coin_txid) = tx.coin_txid.map(|t| t.to_string()) else {
        return Ok(TxStatus::NotFound);
    };

    let mempool: GetMempoolEntryResult = query(rpc, "getmempoolentry", json!([coin_txid])).await?;
    if mempool.is_present() {
        return Ok(TxStatus::InMempool);
    }

    let wallet_tx: Option<GetTransactionResult> = query(rpc, "gettransaction", json!([coin_txid])).await?;
    if let Some(wtx) = &wallet_tx
        && wtx.confirmations > 0
    {
        return Ok(TxStatus::Confirmed(wtx.confirmations as u64));
    }

    let raw: GetRawTransactionVerboseResult = query(rpc, "getrawtransaction", json!([coin_txid, true])).await?;
    if raw.txid.is_some() {
        return Ok(TxStatus::InBlockchainNotWallet);
    }

    if let Some(depth) = wallet_tx.as_ref().and_then(GetTransactionResult::replacement_depth) {
        return Ok(TxStatus::Replaced {
            confirmed: depth >= 2,
        });
    }
    Ok(TxStatus::NotFound)
}
