// SPDX-License-Identifier: CC0-1.0

//! Positional parameter lists for calls whose signature differs between
//! daemon implementations.
//!
//! Callers describe a call with an [`ICall`]; the [`CallSigs`] table for the
//! connected daemon turns it into a method name and parameter array.

use coldwallet_network::DaemonId;
use serde_json::{Value, json};

use crate::error::{RpcError, RpcResult};

/// A call described by meaning rather than by parameter position.
#[derive(Clone, Debug, PartialEq)]
pub enum ICall<'a> {
    /// Create a daemon wallet. With `no_keys` the wallet is watch-only and
    /// blank.
    CreateWallet {
        wallet_name: &'a str,
        no_keys: bool,
        passphrase: &'a str,
        load_on_startup: bool,
    },
    /// Sign a raw transaction with the supplied WIF keys.
    ///
    /// `with_key` selects `signrawtransactionwithkey`, available on daemons
    /// that advertise the `sign_with_key` capability.
    SignRawTransaction {
        hex: &'a str,
        keys: &'a [String],
        prevtxs: Value,
        sighash_type: &'a str,
        with_key: bool,
    },
}

impl<'a> ICall<'a> {
    /// A watch-only, blank wallet loaded on startup.
    pub fn create_tracking_wallet(wallet_name: &'a str) -> Self {
        ICall::CreateWallet {
            wallet_name,
            no_keys: true,
            passphrase: "",
            load_on_startup: true,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ICall::CreateWallet {
                ..
            } => "createwallet",
            ICall::SignRawTransaction {
                ..
            } => "signrawtransaction",
        }
    }
}

/// Call-signature table for one daemon implementation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CallSigs {
    BitcoinCore,
    LitecoinCore,
    BitcoinCashNode,
    OpenEthereum,
}

impl CallSigs {
    /// The table for `daemon`, or `None` for daemons reached without
    /// indirect calls.
    pub fn for_daemon(daemon: DaemonId) -> Option<Self> {
        match daemon {
            DaemonId::BitcoinCore => Some(CallSigs::BitcoinCore),
            DaemonId::LitecoinCore => Some(CallSigs::LitecoinCore),
            DaemonId::BitcoinCashNode => Some(CallSigs::BitcoinCashNode),
            DaemonId::OpenEthereum => Some(CallSigs::OpenEthereum),
            DaemonId::Monerod | DaemonId::MoneroWalletRpc => None,
        }
    }

    /// Method name and positional parameters for `call`.
    pub fn resolve(self, call: &ICall) -> RpcResult<(&'static str, Value)> {
        match (self, call) {
            (CallSigs::OpenEthereum, call) => Err(RpcError::UnknownMethod(call.name().to_string())),

            (
                CallSigs::BitcoinCore,
                ICall::CreateWallet {
                    wallet_name,
                    no_keys,
                    passphrase,
                    load_on_startup,
                },
            ) => Ok((
                "createwallet",
                // wallet_name, disable_private_keys, blank, passphrase,
                // avoid_reuse, descriptors, load_on_startup
                json!([wallet_name, no_keys, no_keys, passphrase, false, false, load_on_startup]),
            )),

            (
                CallSigs::LitecoinCore | CallSigs::BitcoinCashNode,
                ICall::CreateWallet {
                    wallet_name,
                    no_keys,
                    ..
                },
            ) => Ok(("createwallet", json!([wallet_name, no_keys, no_keys]))),

            (
                _,
                ICall::SignRawTransaction {
                    hex,
                    keys,
                    prevtxs,
                    sighash_type,
                    with_key: true,
                },
            ) => Ok(("signrawtransactionwithkey", json!([hex, keys, prevtxs, sighash_type]))),

            (
                _,
                ICall::SignRawTransaction {
                    hex,
                    keys,
                    prevtxs,
                    sighash_type,
                    with_key: false,
                },
            ) => Ok(("signrawtransaction", json!([hex, prevtxs, keys, sighash_type]))),
        }
    }
}
