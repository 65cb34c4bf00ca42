// SPDX-License-Identifier: CC0-1.0

//! # Coldwallet RPC JSON types
//!
//! Serde types for the daemon requests and responses the RPC client works
//! with. Only the fields the wallet reads are modelled; daemons add fields
//! freely between releases and unknown ones are ignored.
//!
//! Amounts in Bitcoin-family responses are kept as [`serde_json::Number`]
//! so their exact decimal text survives deserialization.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use serde_repr::{Deserialize_repr, Serialize_repr};

//
// Bitcoin family
//

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct GetNetworkInfoResult {
    /// Numeric daemon version, e.g. `260000`.
    pub version: u64,
    /// Version string, e.g. `/Satoshi:26.0.0/`.
    pub subversion: String,
    /// Minimum relay fee per kB, in coins.
    #[serde(rename = "relayfee")]
    pub relay_fee: Number,
}

#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct GetBlockchainInfoResult {
    /// `main`, `test` or `regtest`.
    pub chain: String,
    pub blocks: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub softforks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bip9_softforks: Option<Value>,
}

impl GetBlockchainInfoResult {
    /// Whether the daemon reports segwit as active.
    ///
    /// Regtest always counts as active. Both the current `softforks` layout
    /// and the older `bip9_softforks` one are understood.
    pub fn segwit_is_active(&self) -> bool {
        if self.chain == "regtest" {
            return true;
        }
        if self.softforks.as_ref().and_then(|s| s["segwit"]["active"].as_bool()) == Some(true) {
            return true;
        }
        self.bip9_softforks.as_ref().and_then(|s| s["segwit"]["status"].as_str()) == Some("active")
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct GetBlockHeaderResult {
    pub hash: String,
    pub height: u64,
    /// Block time, seconds since the epoch.
    pub time: u64,
}

/// Input reference for `createrawtransaction`.
#[serde_with::skip_serializing_none]
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct CreateRawTransactionInput {
    pub txid: String,
    pub vout: u32,
    pub sequence: Option<u32>,
}

/// Previous output description passed to the signing call.
#[serde_with::skip_serializing_none]
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct SignRawTransactionInput {
    pub txid: String,
    pub vout: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: String,
    #[serde(rename = "redeemScript")]
    pub redeem_script: Option<String>,
    pub amount: Number,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct SignRawTransactionResultError {
    pub txid: String,
    pub vout: u32,
    #[serde(rename = "scriptSig")]
    pub script_sig: String,
    pub sequence: u32,
    pub error: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct SignRawTransactionResult {
    #[serde(with = "hex")]
    pub hex: Vec<u8>,
    pub complete: bool,
    #[serde(default)]
    pub errors: Vec<SignRawTransactionResultError>,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct DecodeRawTransactionResult {
    pub txid: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub vsize: u64,
    #[serde(default)]
    pub locktime: u32,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct CreateWalletResult {
    pub name: String,
    #[serde(default)]
    pub warning: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bip125Replaceable {
    Yes,
    No,
    Unknown,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct GetTransactionResult {
    pub txid: String,
    /// Negative when the transaction conflicts with one in the chain.
    pub confirmations: i64,
    #[serde(rename = "bip125-replaceable", default, skip_serializing_if = "Option::is_none")]
    pub bip125_replaceable: Option<Bip125Replaceable>,
}

impl GetTransactionResult {
    /// `Some(1)` when a replacement sits in the mempool, `Some(2)` when it
    /// is confirmed, `None` when this transaction was not replaced.
    pub fn replacement_depth(&self) -> Option<u64> {
        if self.bip125_replaceable.is_none() || self.confirmations > 0 {
            return None;
        }
        Some((1 - self.confirmations) as u64)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default, Deserialize, Serialize)]
pub struct GetMempoolEntryResult {
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub vsize: Option<u64>,
}

impl GetMempoolEntryResult {
    pub fn is_present(&self) -> bool {
        self.size.is_some() || self.vsize.is_some()
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default, Deserialize, Serialize)]
pub struct GetRawTransactionVerboseResult {
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub confirmations: Option<u64>,
}

//
// Ethereum family (OpenEthereum / Parity)
//

#[derive(Copy, Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct ParityVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct ParityVersionInfo {
    pub version: ParityVersion,
    #[serde(default)]
    pub track: Option<String>,
}

impl ParityVersion {
    /// `major * 10^6 + minor * 10^3 + patch`, comparable with tested
    /// version constants.
    pub fn numeric(&self) -> u64 {
        self.major * 1_000_000 + self.minor * 1_000 + self.patch
    }
}

impl std::fmt::Display for ParityVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct ParityBlockHeader {
    /// `0x`-prefixed hex seconds.
    pub timestamp: String,
}

impl ParityBlockHeader {
    pub fn timestamp_secs(&self) -> Option<u64> {
        parse_hex_quantity(&self.timestamp)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct ParityNodeKind {
    /// `full` or `light`.
    pub capability: String,
    pub availability: String,
}

/// Parses an Ethereum hex quantity such as `0x1b4`.
pub fn parse_hex_quantity(s: &str) -> Option<u64> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}

//
// Monero
//

/// Fee priority for wallet transfers.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum TransferPriority {
    #[default]
    Default = 0,
    Unimportant = 1,
    Normal = 2,
    Elevated = 3,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct TransferDestination {
    /// Atomic units.
    pub amount: u64,
    pub address: String,
}

#[serde_with::skip_serializing_none]
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct TransferParams {
    pub destinations: Vec<TransferDestination>,
    pub account_index: u32,
    pub priority: Option<TransferPriority>,
    pub do_not_relay: bool,
    pub get_tx_hex: bool,
    pub get_tx_metadata: bool,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct TransferResult {
    pub tx_hash: String,
    pub amount: u64,
    pub fee: u64,
    #[serde(default)]
    pub tx_blob: Option<String>,
    #[serde(default)]
    pub tx_metadata: Option<String>,
}

#[serde_with::skip_serializing_none]
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct SweepAllParams {
    pub address: String,
    pub account_index: u32,
    pub priority: Option<TransferPriority>,
    pub do_not_relay: bool,
    pub get_tx_hex: bool,
    pub get_tx_metadata: bool,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct SweepAllResult {
    pub tx_hash_list: Vec<String>,
    pub amount_list: Vec<u64>,
    pub fee_list: Vec<u64>,
    #[serde(default)]
    pub tx_blob_list: Vec<String>,
    #[serde(default)]
    pub tx_metadata_list: Vec<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct SubaddressBalance {
    #[serde(default)]
    pub account_index: u32,
    pub address_index: u32,
    pub address: String,
    pub balance: u64,
    pub unlocked_balance: u64,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct GetBalanceResult {
    pub balance: u64,
    pub unlocked_balance: u64,
    #[serde(default)]
    pub per_subaddress: Vec<SubaddressBalance>,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct CreateAddressResult {
    pub address: String,
    pub address_index: u32,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct CreateAccountResult {
    pub account_index: u32,
    pub address: String,
}

#[serde_with::skip_serializing_none]
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct GenerateFromKeysParams {
    pub filename: String,
    pub address: String,
    pub spendkey: String,
    pub viewkey: String,
    pub password: String,
    pub restore_height: Option<u64>,
    pub autosave_current: Option<bool>,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct GenerateFromKeysResult {
    pub address: String,
    #[serde(default)]
    pub info: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct OpenWalletParams {
    pub filename: String,
    pub password: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct RefreshResult {
    pub blocks_fetched: u64,
    pub received_money: bool,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct GetHeightResult {
    pub height: u64,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct SendRawTransactionParams {
    pub tx_as_hex: String,
    pub do_not_relay: bool,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct SendRawTransactionResult {
    pub status: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub not_relayed: bool,
    #[serde(default)]
    pub double_spend: bool,
}

impl SendRawTransactionResult {
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}
