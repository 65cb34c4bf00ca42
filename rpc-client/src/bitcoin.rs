// SPDX-License-Identifier: CC0-1.0

//! Client for Bitcoin Core and its forks.

use coldwallet_network::{DaemonId, Protocol};
use coldwallet_rpc_json::{GetBlockHeaderResult, GetBlockchainInfoResult, GetNetworkInfoResult};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::auth::{AuthType, resolve_credentials};
use crate::backend::{Endpoint, HostPath};
use crate::call_sigs::{CallSigs, ICall};
use crate::client::{CallOptions, Capability, RpcClient, probe};
use crate::config::Config;
use crate::error::{RpcError, RpcResult};

/// Methods callers may issue through [`BitcoinRpcClient::call`].
pub const RPC_METHODS: &[&str] = &[
    "backupwallet",
    "createrawtransaction",
    "decoderawtransaction",
    "disconnectnode",
    "estimatefee",
    "estimatesmartfee",
    "getaddressesbyaccount",
    "getaddressesbylabel",
    "getblock",
    "getblockchaininfo",
    "getblockcount",
    "getblockhash",
    "getblockheader",
    "getblockstats",
    "getmempoolinfo",
    "getmempoolentry",
    "getnettotals",
    "getnetworkinfo",
    "getpeerinfo",
    "getrawmempool",
    "getrawtransaction",
    "gettransaction",
    "importaddress",
    "listaccounts",
    "listlabels",
    "listunspent",
    "setlabel",
    "sendrawtransaction",
    "signrawtransaction",
    "signrawtransactionwithkey",
    "validateaddress",
    "walletpassphrase",
];

/// A connected Bitcoin-family daemon.
#[derive(Debug)]
pub struct BitcoinRpcClient {
    rpc: RpcClient,
    proto: Protocol,
    daemon: DaemonId,
    caps: Vec<Capability>,
    network_info: GetNetworkInfoResult,
    blockchain_info: GetBlockchainInfoResult,
    /// Chain height at connect time.
    pub blockcount: u64,
    /// Timestamp of the tip block at connect time.
    pub cur_date: u64,
    /// Normalized chain name: `mainnet`, `testnet` or `regtest`.
    pub chain: String,
}

impl BitcoinRpcClient {
    /// Connects and runs the handshake: credentials, chain identity,
    /// capabilities and the tracking wallet.
    pub async fn connect(config: &Config) -> RpcResult<Self> {
        let proto = config.protocol;
        let daemon = proto.daemon_id();
        let host = config.rpc_host.as_str();
        let port = config.port();
        tracing::debug!("Connecting to {} at {}:{}", daemon.coind_name(), host, port);

        probe(host, port).await?;

        let mut endpoint = Endpoint::new(host, port, config.http_timeout);
        endpoint.host_path = HostPath::Wallet;
        endpoint.auth = Some(resolve_credentials(config)?);
        endpoint.auth_type = Some(AuthType::Basic);
        endpoint.debug = config.debug_rpc;

        let rpc = RpcClient::new(endpoint, config.backend)?
            .with_call_sigs(CallSigs::for_daemon(daemon))
            .with_fail_on_command(config.fail_on_command.clone());

        let opts = CallOptions::default();
        let results = rpc
            .gathered_call(
                &[
                    ("getnetworkinfo", json!([])),
                    ("getblockcount", json!([])),
                    ("getblockchaininfo", json!([])),
                    ("getblockhash", json!([0])),
                ],
                &opts,
            )
            .await?;
        let [network_info, blockcount, blockchain_info, block0]: [Value; 4] =
            results.try_into().map_err(|_| RpcError::failure("incomplete response to connect calls"))?;
        let network_info: GetNetworkInfoResult = serde_json::from_value(network_info)?;
        let blockchain_info: GetBlockchainInfoResult = serde_json::from_value(blockchain_info)?;
        let blockcount: u64 = serde_json::from_value(blockcount)?;
        let block0: String = serde_json::from_value(block0)?;

        let tip: String = rpc.call_as("getblockhash", json!([blockcount])).await?;
        let header: GetBlockHeaderResult = rpc.call_as("getblockheader", json!([tip])).await?;

        let chain = normalize_chain(&blockchain_info.chain);

        let mut client = Self {
            rpc,
            proto,
            daemon,
            caps: vec![Capability::FullNode],
            network_info,
            blockchain_info,
            blockcount,
            cur_date: header.time,
            chain,
        };

        // testnet genesis blocks may be reset, so identity is checked on mainnet only
        if client.chain == "mainnet" {
            client.check_chainfork_mismatch(&block0).await?;
        }
        client.probe_caps().await?;
        if let Some(name) = &config.tracking_wallet {
            client.check_tracking_wallet(name).await?;
        }
        Ok(client)
    }

    async fn check_chainfork_mismatch(&self, block0: &str) -> RpcResult<()> {
        let wrong_chain = |reason: String| RpcError::WrongChain {
            coin: self.proto.coin().symbol().to_string(),
            reason,
        };
        if self.proto.genesis_hash() != Some(block0) {
            return Err(wrong_chain(format!("Invalid Genesis block for {} protocol", self.proto.cls_name())));
        }
        for fork in self.proto.forks() {
            if self.blockcount < fork.height {
                break;
            }
            let hash: String = self.rpc.call_as("getblockhash", json!([fork.height])).await?;
            if hash != fork.hash {
                return Err(wrong_chain(format!(
                    "Bad block hash at fork block {}. Is this the {} chain?",
                    fork.height, fork.name
                )));
            }
        }
        Ok(())
    }

    async fn probe_caps(&mut self) -> RpcResult<()> {
        for (func, cap) in [("setlabel", Capability::LabelApi), ("signrawtransactionwithkey", Capability::SignWithKey)] {
            let help = self.rpc.call("help", json!([func])).await?;
            if help.as_str().is_some_and(|h| h.split('\n').count() > 3) {
                self.caps.push(cap);
            }
        }
        tracing::debug!("{} capabilities: {:?}", self.daemon.coind_name(), self.caps);
        Ok(())
    }

    /// Makes sure exactly one wallet is loaded, creating `name` if none is.
    async fn check_tracking_wallet(&self, name: &str) -> RpcResult<()> {
        let wallets: Vec<String> = self.rpc.call_as("listwallets", json!([])).await?;
        match wallets.len() {
            0 => {
                self.rpc.icall(&ICall::create_tracking_wallet(name), &CallOptions::default()).await?;
                tracing::info!("Created {} wallet '{}'", self.daemon.coind_name(), name);
                Ok(())
            }
            1 => Ok(()),
            _ => Err(RpcError::WalletAmbiguity {
                daemon: self.daemon.coind_name(),
                wallets,
            }),
        }
    }

    /// Calls an allow-listed daemon method.
    pub async fn call(&self, method: &str, params: Value) -> RpcResult<Value> {
        self.call_with(method, params, &CallOptions::default()).await
    }

    pub async fn call_with(&self, method: &str, params: Value, opts: &CallOptions<'_>) -> RpcResult<Value> {
        if !RPC_METHODS.contains(&method) {
            return Err(RpcError::UnknownMethod(method.to_string()));
        }
        self.rpc.call_with(method, params, opts).await
    }

    /// [`BitcoinRpcClient::call`], deserializing the result.
    pub async fn call_as<T: DeserializeOwned>(&self, method: &str, params: Value) -> RpcResult<T> {
        Ok(serde_json::from_value(self.call(method, params).await?)?)
    }

    /// Indirect call through the daemon's call-signature table.
    pub async fn icall(&self, call: &ICall<'_>) -> RpcResult<Value> {
        self.rpc.icall(call, &CallOptions::default()).await
    }

    /// The underlying transport client, without the method allow-list.
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub fn proto(&self) -> &Protocol {
        &self.proto
    }

    pub fn daemon(&self) -> DaemonId {
        self.daemon
    }

    pub fn has_cap(&self, cap: Capability) -> bool {
        self.caps.contains(&cap)
    }

    pub fn daemon_version(&self) -> u64 {
        self.network_info.version
    }

    pub fn daemon_version_str(&self) -> &str {
        &self.network_info.subversion
    }

    /// Whether segwit is active on the connected chain, from the chain info
    /// fetched at connect time.
    pub fn segwit_is_active(&self) -> bool {
        self.blockchain_info.segwit_is_active()
    }

    /// Network info fetched at connect time.
    pub fn network_info(&self) -> &GetNetworkInfoResult {
        &self.network_info
    }
}

/// `main` becomes `mainnet`, `test` becomes `testnet`; `regtest` is kept.
fn normalize_chain(chain: &str) -> String {
    if chain == "regtest" {
        chain.to_string()
    } else {
        format!("{}net", chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_chain() {
        assert_eq!(normalize_chain("main"), "mainnet");
        assert_eq!(normalize_chain("test"), "testnet");
        assert_eq!(normalize_chain("regtest"), "regtest");
    }

    #[test]
    fn test_allow_list() {
        assert!(RPC_METHODS.contains(&"signrawtransactionwithkey"));
        assert!(!RPC_METHODS.contains(&"stop"));
        assert!(!RPC_METHODS.contains(&"dumpprivkey"));
    }
}
