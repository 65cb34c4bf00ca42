// SPDX-License-Identifier: CC0-1.0

//! Client for OpenEthereum (Parity) daemons.

use coldwallet_network::{DaemonId, Protocol};
use coldwallet_rpc_json::{ParityBlockHeader, ParityNodeKind, ParityVersionInfo, parse_hex_quantity};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::backend::Endpoint;
use crate::call_sigs::CallSigs;
use crate::client::{CallOptions, Capability, RpcClient, probe};
use crate::config::Config;
use crate::error::{RpcError, RpcResult};

pub const RPC_METHODS: &[&str] = &[
    "eth_accounts",
    "eth_blockNumber",
    "eth_call",
    // EIP-155 chain id at the current best block, or null
    "eth_chainId",
    "eth_gasPrice",
    "eth_getBalance",
    "eth_getBlockByHash",
    "eth_getCode",
    "eth_getTransactionByHash",
    "eth_getTransactionReceipt",
    "eth_protocolVersion",
    "eth_sendRawTransaction",
    "eth_signTransaction",
    "eth_syncing",
    "net_listening",
    "net_peerCount",
    "net_version",
    "parity_chain",
    "parity_chainId",
    "parity_chainStatus",
    "parity_composeTransaction",
    "parity_gasCeilTarget",
    "parity_gasFloorTarget",
    "parity_getBlockHeaderByNumber",
    "parity_localTransactions",
    "parity_minGasPrice",
    "parity_mode",
    "parity_netPeers",
    "parity_nextNonce",
    "parity_nodeKind",
    "parity_nodeName",
    "parity_pendingTransactions",
    "parity_pendingTransactionsStats",
    "parity_versionInfo",
];

/// A connected Ethereum-family daemon.
#[derive(Debug)]
pub struct EthereumRpcClient {
    rpc: RpcClient,
    proto: Protocol,
    caps: Vec<Capability>,
    version: ParityVersionInfo,
    pub blockcount: u64,
    pub cur_date: u64,
    /// Chain name as reported by `parity_chain`, spaces replaced by
    /// underscores.
    pub chain: String,
}

impl EthereumRpcClient {
    pub async fn connect(config: &Config) -> RpcResult<Self> {
        let host = config.rpc_host.as_str();
        let port = config.port();
        probe(host, port).await?;

        let mut endpoint = Endpoint::new(host, port, config.http_timeout);
        endpoint.debug = config.debug_rpc;
        let rpc = RpcClient::new(endpoint, config.backend)?
            .with_call_sigs(CallSigs::for_daemon(DaemonId::OpenEthereum))
            .with_fail_on_command(config.fail_on_command.clone());

        let block_number: String = rpc.call_as("eth_blockNumber", json!([])).await?;
        let blockcount = hex_quantity(&block_number)?;

        let results = rpc
            .gathered_call(
                &[
                    ("parity_versionInfo", json!([])),
                    ("parity_getBlockHeaderByNumber", json!([])),
                    ("parity_chain", json!([])),
                    ("parity_nodeKind", json!([])),
                ],
                &CallOptions::default(),
            )
            .await?;
        let [version, header, chain, node_kind]: [Value; 4] =
            results.try_into().map_err(|_| RpcError::failure("incomplete response to connect calls"))?;
        let version: ParityVersionInfo = serde_json::from_value(version)?;
        let header: ParityBlockHeader = serde_json::from_value(header)?;
        let chain: String = serde_json::from_value(chain)?;
        let node_kind: ParityNodeKind = serde_json::from_value(node_kind)?;

        let mut caps = Vec::new();
        if node_kind.capability == "full" {
            caps.push(Capability::FullNode);
        }
        match rpc.call("eth_chainId", json!([])).await {
            Ok(_) => caps.push(Capability::EthChainId),
            Err(RpcError::Failure {
                ..
            }) => {}
            Err(e) => return Err(e),
        }

        Ok(Self {
            rpc,
            proto: config.protocol,
            caps,
            version,
            blockcount,
            cur_date: hex_quantity(&header.timestamp)?,
            chain: chain.replace(' ', "_"),
        })
    }

    /// Calls an allow-listed daemon method.
    pub async fn call(&self, method: &str, params: Value) -> RpcResult<Value> {
        if !RPC_METHODS.contains(&method) {
            return Err(RpcError::UnknownMethod(method.to_string()));
        }
        self.rpc.call(method, params).await
    }

    pub async fn call_as<T: DeserializeOwned>(&self, method: &str, params: Value) -> RpcResult<T> {
        Ok(serde_json::from_value(self.call(method, params).await?)?)
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub fn proto(&self) -> &Protocol {
        &self.proto
    }

    pub fn has_cap(&self, cap: Capability) -> bool {
        self.caps.contains(&cap)
    }

    pub fn daemon_version(&self) -> u64 {
        self.version.version.numeric()
    }

    pub fn daemon_version_str(&self) -> String {
        self.version.version.to_string()
    }
}

fn hex_quantity(s: &str) -> RpcResult<u64> {
    parse_hex_quantity(s).ok_or_else(|| RpcError::failure(format!("'{}': invalid hex quantity", s)))
}
