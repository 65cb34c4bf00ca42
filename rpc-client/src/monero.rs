// SPDX-License-Identifier: CC0-1.0

//! Clients for `monerod` and `monero-wallet-rpc`.
//!
//! Monero's JSON-RPC takes keyword parameters. The daemon also serves a
//! second set of methods outside the JSON-RPC envelope, each at its own
//! path; [`MoneroRpcClientRaw`] speaks that dialect.

use std::time::Duration;

use coldwallet_rpc_json::{
    CreateAccountResult, CreateAddressResult, GenerateFromKeysParams, GenerateFromKeysResult, GetBalanceResult,
    GetHeightResult, OpenWalletParams, RefreshResult, SendRawTransactionParams, SendRawTransactionResult,
    SweepAllParams, SweepAllResult, TransferParams, TransferResult,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::auth::{Auth, AuthType};
use crate::backend::{BackendKind, Endpoint, HostPath};
use crate::client::{CallOptions, Envelope, RpcClient, probe};
use crate::error::{RpcError, RpcResult};

/// Long enough for a wallet to sync about a million blocks.
pub const LONG_CALL_TIMEOUT: Duration = Duration::from_secs(3600);

pub const DAEMON_RPC_METHODS: &[&str] = &["get_info"];

pub const DAEMON_RAW_RPC_METHODS: &[&str] = &["get_height", "send_raw_transaction"];

pub const WALLET_RPC_METHODS: &[&str] = &[
    "get_version",
    // sync height of the open wallet
    "get_height",
    "get_balance",
    "get_accounts",
    "create_wallet",
    "generate_from_keys",
    "open_wallet",
    "close_wallet",
    "restore_deterministic_wallet",
    "refresh",
    "create_address",
    "create_account",
    "transfer",
    "sweep_all",
    "store",
];

/// Connection settings shared by the Monero clients.
#[derive(Clone, Debug)]
pub struct MoneroConnectOptions {
    /// Monero RPC is served over TLS; plain HTTP is for local testing.
    pub https: bool,
    /// Probe the port before building the client.
    pub test_connection: bool,
    pub backend: BackendKind,
    pub timeout: Duration,
    pub debug_rpc: bool,
}

impl Default for MoneroConnectOptions {
    fn default() -> Self {
        Self {
            https: true,
            test_connection: true,
            backend: BackendKind::Blocking,
            timeout: Duration::from_secs(60),
            debug_rpc: false,
        }
    }
}

async fn build(
    host: &str,
    port: u16,
    auth: Option<Auth>,
    auth_type: Option<AuthType>,
    base_path: &str,
    host_path: HostPath,
    opts: &MoneroConnectOptions,
) -> RpcResult<RpcClient> {
    if opts.test_connection {
        probe(host, port).await?;
    }
    let mut endpoint = Endpoint::new(host, port, opts.timeout);
    endpoint.https = opts.https;
    // daemons use self-signed certificates
    endpoint.verify_server = false;
    endpoint.base_path = base_path.to_string();
    endpoint.host_path = host_path;
    endpoint.auth = auth;
    endpoint.auth_type = auth_type;
    endpoint.debug = opts.debug_rpc;
    RpcClient::new(endpoint, opts.backend)
}

fn check_method(allowed: &[&str], method: &str) -> RpcResult<()> {
    if allowed.contains(&method) {
        Ok(())
    } else {
        Err(RpcError::UnknownMethod(method.to_string()))
    }
}

fn to_params<P: Serialize>(params: &P) -> RpcResult<Value> {
    Ok(serde_json::to_value(params)?)
}

/// JSON-RPC client for `monerod` at `/json_rpc`.
#[derive(Debug)]
pub struct MoneroRpcClient {
    rpc: RpcClient,
    methods: &'static [&'static str],
}

impl MoneroRpcClient {
    pub async fn new(host: &str, port: u16, opts: &MoneroConnectOptions) -> RpcResult<Self> {
        Ok(Self {
            rpc: build(host, port, None, None, "/json_rpc", HostPath::Fixed, opts).await?,
            methods: DAEMON_RPC_METHODS,
        })
    }

    /// Calls `method` with keyword parameters (a JSON object).
    pub async fn call(&self, method: &str, params: Value) -> RpcResult<Value> {
        check_method(self.methods, method)?;
        let payload = json!({ "id": 0, "jsonrpc": "2.0", "method": method, "params": params });
        self.rpc.send(payload, &CallOptions::timeout(LONG_CALL_TIMEOUT)).await
    }

    pub async fn call_as<T: DeserializeOwned>(&self, method: &str, params: Value) -> RpcResult<T> {
        Ok(serde_json::from_value(self.call(method, params).await?)?)
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }
}

/// Client for the daemon's non-JSON-RPC methods: the bare parameter object
/// is posted to `/<method>` and the whole response body is the result.
#[derive(Debug)]
pub struct MoneroRpcClientRaw {
    rpc: RpcClient,
}

impl MoneroRpcClientRaw {
    pub async fn new(host: &str, port: u16, opts: &MoneroConnectOptions) -> RpcResult<Self> {
        let rpc = build(host, port, None, None, "/", HostPath::Method, opts).await?.with_envelope(Envelope::Raw);
        Ok(Self {
            rpc,
        })
    }

    pub async fn call(&self, method: &str, params: Value) -> RpcResult<Value> {
        check_method(DAEMON_RAW_RPC_METHODS, method)?;
        self.rpc.send(params, &CallOptions::wallet(method)).await
    }

    pub async fn get_height(&self) -> RpcResult<u64> {
        let res: GetHeightResult = serde_json::from_value(self.call("get_height", json!({})).await?)?;
        Ok(res.height)
    }

    /// Submits a signed transaction. A response with a non-OK status is
    /// returned as a failure carrying the daemon's reason.
    pub async fn send_raw_transaction(&self, params: &SendRawTransactionParams) -> RpcResult<SendRawTransactionResult> {
        let res: SendRawTransactionResult =
            serde_json::from_value(self.call("send_raw_transaction", to_params(params)?).await?)?;
        if !res.is_ok() {
            let reason = if res.reason.is_empty() { res.status.clone() } else { res.reason.clone() };
            return Err(RpcError::failure(format!("transaction not relayed: {}", reason)));
        }
        Ok(res)
    }
}

/// Client for `monero-wallet-rpc`, which requires digest auth.
#[derive(Debug)]
pub struct MoneroWalletRpcClient {
    inner: MoneroRpcClient,
}

impl MoneroWalletRpcClient {
    pub async fn new(host: &str, port: u16, auth: Auth, opts: &MoneroConnectOptions) -> RpcResult<Self> {
        let rpc = build(host, port, Some(auth), Some(AuthType::Digest), "/json_rpc", HostPath::Fixed, opts).await?;
        Ok(Self {
            inner: MoneroRpcClient {
                rpc,
                methods: WALLET_RPC_METHODS,
            },
        })
    }

    pub async fn call(&self, method: &str, params: Value) -> RpcResult<Value> {
        self.inner.call(method, params).await
    }

    pub async fn generate_from_keys(&self, params: &GenerateFromKeysParams) -> RpcResult<GenerateFromKeysResult> {
        self.inner.call_as("generate_from_keys", to_params(params)?).await
    }

    pub async fn open_wallet(&self, filename: &str, password: &str) -> RpcResult<()> {
        let params = OpenWalletParams {
            filename: filename.to_string(),
            password: password.to_string(),
        };
        self.inner.call("open_wallet", to_params(&params)?).await.map(drop)
    }

    pub async fn close_wallet(&self) -> RpcResult<()> {
        self.inner.call("close_wallet", json!({})).await.map(drop)
    }

    pub async fn refresh(&self, start_height: Option<u64>) -> RpcResult<RefreshResult> {
        let params = match start_height {
            Some(h) => json!({ "start_height": h }),
            None => json!({}),
        };
        self.inner.call_as("refresh", params).await
    }

    pub async fn get_height(&self) -> RpcResult<u64> {
        let res: GetHeightResult = self.inner.call_as("get_height", json!({})).await?;
        Ok(res.height)
    }

    pub async fn get_balance(&self, account_index: u32) -> RpcResult<GetBalanceResult> {
        self.inner.call_as("get_balance", json!({ "account_index": account_index })).await
    }

    pub async fn create_address(&self, account_index: u32, label: &str) -> RpcResult<CreateAddressResult> {
        self.inner.call_as("create_address", json!({ "account_index": account_index, "label": label })).await
    }

    pub async fn create_account(&self, label: &str) -> RpcResult<CreateAccountResult> {
        self.inner.call_as("create_account", json!({ "label": label })).await
    }

    pub async fn transfer(&self, params: &TransferParams) -> RpcResult<TransferResult> {
        self.inner.call_as("transfer", to_params(params)?).await
    }

    pub async fn sweep_all(&self, params: &SweepAllParams) -> RpcResult<SweepAllResult> {
        self.inner.call_as("sweep_all", to_params(params)?).await
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.inner.rpc
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn test_allow_lists() {
        let opts = MoneroConnectOptions {
            test_connection: false,
            ..Default::default()
        };
        let daemon = MoneroRpcClient::new("localhost", 18081, &opts).await.unwrap();
        assert_eq!(daemon.rpc().endpoint().request_url(None), "https://localhost:18081/json_rpc");
        assert_matches!(daemon.call("get_balance", json!({})).await, Err(RpcError::UnknownMethod(m)) if m == "get_balance");

        let raw = MoneroRpcClientRaw::new("localhost", 18081, &opts).await.unwrap();
        assert_matches!(raw.call("get_info", json!({})).await, Err(RpcError::UnknownMethod(_)));

        let wallet = MoneroWalletRpcClient::new("localhost", 18082, Auth::new("u", "p"), &opts).await.unwrap();
        assert_eq!(wallet.rpc().endpoint().auth_type, Some(AuthType::Digest));
        assert_matches!(wallet.call("get_info", json!({})).await, Err(RpcError::UnknownMethod(_)));
    }
}
