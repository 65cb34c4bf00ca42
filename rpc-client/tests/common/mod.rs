//! Mock coin daemons for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use coldwallet::{Coin, Network, Protocol};
use coldwallet_rpc::{BackendKind, Config};
use serde_json::{Value, json};
use wiremock::{Mock, MockServer, Request, ResponseTemplate, matchers};

pub const BTC_MAINNET_GENESIS: &str = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";
pub const BTC_REGTEST_GENESIS: &str = "0f9188f13cb7b2c71f2a335e3a4fc328bf5beb436012afca590b1a11466e2206";
pub const TIP_HASH: &str = "00000000000000000002a7c4c1e48d76c5a37902165a270156b7a8d72728a054";

/// A daemon answer: a result, or an RPC error code and message.
pub type Reply = Result<Value, (i64, String)>;

/// Starts a JSON-RPC server that answers each request through `handler`.
pub async fn mock_daemon<F>(handler: F) -> MockServer
where
    F: Fn(&str, &Value) -> Reply + Send + Sync + 'static,
{
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(move |req: &Request| {
            let body: Value = match serde_json::from_slice(&req.body) {
                Ok(v) => v,
                Err(_) => return ResponseTemplate::new(400),
            };
            let id = body["id"].clone();
            let method = body["method"].as_str().unwrap_or_default();
            match handler(method, &body["params"]) {
                Ok(result) => ResponseTemplate::new(200).set_body_json(json!({
                    "result": result, "error": null, "id": id
                })),
                Err((code, message)) => ResponseTemplate::new(500).set_body_json(json!({
                    "result": null, "error": {"code": code, "message": message}, "id": id
                })),
            }
        })
        .mount(&server)
        .await;
    server
}

pub fn not_found() -> Reply {
    Err((-32601, "Method not found".to_string()))
}

/// Default answers of a healthy Bitcoin Core node on `chain` at height 150.
pub fn bitcoind(chain: &'static str, method: &str, params: &Value) -> Reply {
    let genesis = if chain == "main" { BTC_MAINNET_GENESIS } else { BTC_REGTEST_GENESIS };
    Ok(match method {
        "getnetworkinfo" => json!({"version": 250000, "subversion": "/Satoshi:25.0.0/", "relayfee": 0.00001000}),
        "getblockcount" => json!(150),
        "getblockchaininfo" => json!({"chain": chain, "blocks": 150, "softforks": {"segwit": {"active": true}}}),
        "getblockhash" if params[0] == json!(0) => json!(genesis),
        "getblockhash" => json!(TIP_HASH),
        "getblockheader" => json!({"hash": TIP_HASH, "height": 150, "time": 1_700_000_000}),
        "help" if params[0] == "signrawtransactionwithkey" => {
            json!("signrawtransactionwithkey \"hexstring\" [\"privatekey\",...]\n\nSign inputs.\n\nArguments:\n1. hexstring")
        }
        "help" => json!("help: unknown command"),
        "listwallets" => json!(["coldwallet-tracking-wallet"]),
        _ => return not_found(),
    })
}

pub fn config_for(server: &MockServer, proto: Protocol, backend: BackendKind) -> Config {
    Config::new(proto)
        .with_rpc_host("127.0.0.1", Some(server.address().port()))
        .with_rpc_credentials("user", "pass")
        .with_backend(backend)
        .with_http_timeout(Duration::from_secs(10))
}

pub fn btc(network: Network) -> Protocol {
    Protocol::new(Coin::Btc, network)
}

/// Methods of the JSON-RPC requests the server has received, in order.
pub async fn received_methods(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
        .filter_map(|b| b["method"].as_str().map(str::to_string))
        .collect()
}
