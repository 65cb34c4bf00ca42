//! Monero daemon and wallet RPC against mock servers over plain HTTP.

use assert_matches::assert_matches;
use coldwallet_rpc::{Auth, BackendKind, MoneroConnectOptions, MoneroRpcClientRaw, MoneroWalletRpcClient, RpcError};
use coldwallet_rpc_json::SendRawTransactionParams;
use serde_json::{Value, json};
use wiremock::{Mock, MockServer, Request, ResponseTemplate, matchers};

const CHALLENGE: &str = r#"Digest qop="auth",algorithm=MD5,realm="monero-rpc",nonce="q1Ajjj5ia+s9m+c+ve2V9w==",stale=false"#;

fn local(backend: BackendKind) -> MoneroConnectOptions {
    MoneroConnectOptions {
        https: false,
        backend,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_raw_send_raw_transaction() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/send_raw_transaction"))
        .and(matchers::body_json(json!({"tx_as_hex": "deadbeef", "do_not_relay": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK", "reason": "", "not_relayed": false, "double_spend": false, "untrusted": false
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/get_height"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"height": 3_100_000, "status": "OK"})))
        .mount(&server)
        .await;

    let port = server.address().port();
    let raw = MoneroRpcClientRaw::new("127.0.0.1", port, &local(BackendKind::Reqwest)).await.unwrap();
    assert_eq!(raw.get_height().await.unwrap(), 3_100_000);

    let params = SendRawTransactionParams {
        tx_as_hex: "deadbeef".to_string(),
        do_not_relay: false,
    };
    let res = raw.send_raw_transaction(&params).await.unwrap();
    assert!(res.is_ok());
}

#[tokio::test]
async fn test_raw_send_rejected() {
    let server = MockServer::start().await;
    Mock::given(matchers::path("/send_raw_transaction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Failed", "reason": "double spend", "double_spend": true
        })))
        .mount(&server)
        .await;

    let raw = MoneroRpcClientRaw::new("127.0.0.1", server.address().port(), &local(BackendKind::Raw)).await.unwrap();
    let params = SendRawTransactionParams {
        tx_as_hex: "00".to_string(),
        do_not_relay: false,
    };
    let err = raw.send_raw_transaction(&params).await.unwrap_err();
    assert_eq!(err.failure_message(), Some("transaction not relayed: double spend"));
}

async fn digest_wallet_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/json_rpc"))
        .respond_with(|req: &Request| {
            let Some(auth) = req.headers.get("authorization").and_then(|v| v.to_str().ok()) else {
                return ResponseTemplate::new(401).insert_header("WWW-Authenticate", CHALLENGE);
            };
            if !auth.starts_with(r#"Digest username="wallet", realm="monero-rpc""#) || !auth.contains("nc=00000001") {
                return ResponseTemplate::new(401).insert_header("WWW-Authenticate", CHALLENGE);
            }
            let body: Value = serde_json::from_slice(&req.body).unwrap();
            let result = match body["method"].as_str() {
                Some("get_height") => json!({"height": 3_099_990}),
                Some("get_balance") => json!({"balance": 5_000_000_000_000u64, "unlocked_balance": 4_000_000_000_000u64}),
                _ => return ResponseTemplate::new(200).set_body_json(json!({
                    "id": 0, "jsonrpc": "2.0", "error": {"code": -32601, "message": "Method not found"}
                })),
            };
            ResponseTemplate::new(200).set_body_json(json!({"id": 0, "jsonrpc": "2.0", "result": result}))
        })
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_wallet_digest_auth() {
    let server = digest_wallet_server().await;
    let port = server.address().port();
    let wallet = MoneroWalletRpcClient::new("127.0.0.1", port, Auth::new("wallet", "pass"), &local(BackendKind::Blocking))
        .await
        .unwrap();

    assert_eq!(wallet.get_height().await.unwrap(), 3_099_990);
    let balance = wallet.get_balance(0).await.unwrap();
    assert_eq!(balance.unlocked_balance, 4_000_000_000_000);

    // every call is answered by a challenge first
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 4);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["id"], json!(0));
    assert_eq!(body["params"], json!({}));
}

#[tokio::test]
async fn test_wallet_bad_credentials() {
    let server = digest_wallet_server().await;
    let port = server.address().port();
    let wallet = MoneroWalletRpcClient::new("127.0.0.1", port, Auth::new("intruder", "x"), &local(BackendKind::Blocking))
        .await
        .unwrap();
    assert_matches!(wallet.get_height().await, Err(RpcError::Failure { status: Some(401), .. }));
}

#[tokio::test]
async fn test_wallet_probe_fails_without_listener() {
    let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let res = MoneroWalletRpcClient::new("127.0.0.1", port, Auth::new("u", "p"), &local(BackendKind::Blocking)).await;
    assert_matches!(res, Err(RpcError::Socket { .. }));
}
