//! Creating, signing and sending a transaction through a mock Bitcoin Core.

mod common;

use assert_matches::assert_matches;
use coldwallet::{Amount, Coin, IntegrityError, Network, Protocol, Tx, TxError, TxInput, TxState};
use coldwallet_rpc::{BackendKind, BitcoinRpcClient, Error, TxStatus, tx_ops};
use common::*;
use serde_json::{Value, json};
use wiremock::MockServer;

const LEGACY_TX: &str = "0100000001a15d57094aa7a21a28cb20b59aab8fc7d1149a3bdbcddba9c622e4f5f6a99ece010000006c493046022100f93bb0e7d8db7bd46e40132d1f8242026e045f03a0efe71bbb8e3f475e970d790221009337cd7f1f929f00cc6ff01f03729b069a7c21b59b1736ddfee5db5946c5da8c0121033b9b137ee87d5a812d6f506efdd37f0affa7ffc310711c06c7f3e097c9447c52ffffffff0100e1f505000000001976a9140389035a9225b3839e2bbf32d826a1e222031fd888ac00000000";
const LEGACY_UNSIGNED: &str = "0100000001a15d57094aa7a21a28cb20b59aab8fc7d1149a3bdbcddba9c622e4f5f6a99ece0100000000ffffffff0100e1f505000000001976a9140389035a9225b3839e2bbf32d826a1e222031fd888ac00000000";
const LEGACY_TXID: &str = "a6eab3c14ab5272a58a5ba91505ba1a4b6d7a3a9fcbd187b6cd99a7b6d548cb7";
const WIF: &str = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";

fn legacy_model() -> Tx {
    let mut tx = Tx::new(Protocol::new(Coin::Btc, Network::Mainnet));
    tx.inputs.push(TxInput {
        txid: "ce9ea9f6f5e422c6a9dbcddb3b9a14d1c78fab9ab520cb281aa2a74a09575da1".parse().unwrap(),
        vout: 1,
        amount: Amount::from_sat(100_010_000),
        addr: "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA".to_string(),
        mmid: None,
        label: None,
        confs: 12,
        script_pubkey: hex::decode("76a914d8b0b8f5a1c6ee2a3e6a1e8c1d2a3b4c5d6e7f8088ac").unwrap(),
        sequence: None,
    });
    tx.add_output("1KhAQw5BU3i4G8BDGpw8YqUKRLuW3mQdh", Amount::from_sat(100_000_000), false).unwrap();
    tx
}

fn absent() -> Reply {
    Err((-5, "No such mempool or blockchain transaction".to_string()))
}

/// Mainnet node that signs with `signed_hex` and knows nothing of the
/// transaction until it is sent.
fn mainnet_node(signed_hex: &'static str) -> impl Fn(&str, &Value) -> Reply + Send + Sync + 'static {
    move |method, params| match method {
        "createrawtransaction" => {
            assert_eq!(params[0][0]["vout"], json!(1));
            assert_eq!(params[1]["1KhAQw5BU3i4G8BDGpw8YqUKRLuW3mQdh"].to_string(), "1.00000000");
            Ok(json!(LEGACY_UNSIGNED))
        }
        "signrawtransactionwithkey" => {
            assert_eq!(params[1], json!([WIF]));
            assert_eq!(params[2][0]["amount"].to_string(), "1.00010000");
            Ok(json!({"hex": signed_hex, "complete": true}))
        }
        "decoderawtransaction" => Ok(json!({"txid": LEGACY_TXID, "size": 191, "vsize": 191, "locktime": 0})),
        "getmempoolentry" | "gettransaction" | "getrawtransaction" => absent(),
        "sendrawtransaction" => Ok(json!(LEGACY_TXID)),
        _ => bitcoind("main", method, params),
    }
}

async fn connect(server: &MockServer) -> BitcoinRpcClient {
    let config = config_for(server, btc(Network::Mainnet), BackendKind::Reqwest);
    BitcoinRpcClient::connect(&config).await.unwrap()
}

#[tokio::test]
async fn test_create_sign_send() {
    let server = mock_daemon(mainnet_node(LEGACY_TX)).await;
    let rpc = connect(&server).await;

    let mut tx = legacy_model();
    tx_ops::create_raw(&mut tx, &rpc).await.unwrap();
    assert_eq!(tx.hex, LEGACY_UNSIGNED);
    assert_eq!(tx.txid.as_ref().unwrap().as_str(), "3141D5");
    assert_eq!(tx.blockcount, 150);
    assert_eq!(tx.state(), TxState::Unsigned);

    tx_ops::sign(&mut tx, &rpc, &[WIF.to_string()]).await.unwrap();
    assert_eq!(tx.state(), TxState::Signed);
    assert_eq!(tx.coin_txid.unwrap().to_string(), LEGACY_TXID);

    assert_eq!(tx_ops::get_status(&tx, &rpc).await.unwrap(), TxStatus::NotFound);
    let txid = tx_ops::send(&mut tx, &rpc).await.unwrap();
    assert_eq!(txid.to_string(), LEGACY_TXID);
    assert_eq!(tx.state(), TxState::Sent);

    let methods = received_methods(&server).await;
    assert_eq!(methods.iter().filter(|m| *m == "sendrawtransaction").count(), 1);
}

#[tokio::test]
async fn test_sign_rejects_tampered_hex() {
    // the signed hex carries a locktime the wallet never asked for
    const TAMPERED: &str = "0100000001a15d57094aa7a21a28cb20b59aab8fc7d1149a3bdbcddba9c622e4f5f6a99ece010000006c493046022100f93bb0e7d8db7bd46e40132d1f8242026e045f03a0efe71bbb8e3f475e970d790221009337cd7f1f929f00cc6ff01f03729b069a7c21b59b1736ddfee5db5946c5da8c0121033b9b137ee87d5a812d6f506efdd37f0affa7ffc310711c06c7f3e097c9447c52ffffffff0100e1f505000000001976a9140389035a9225b3839e2bbf32d826a1e222031fd888ac01000000";
    let server = mock_daemon(mainnet_node(TAMPERED)).await;
    let rpc = connect(&server).await;

    let mut tx = legacy_model();
    tx_ops::create_raw(&mut tx, &rpc).await.unwrap();
    let err = tx_ops::sign(&mut tx, &rpc, &[WIF.to_string()]).await.unwrap_err();
    assert_matches!(
        &err,
        Error::Wallet(coldwallet::Error::Tx(TxError::Integrity(IntegrityError::LockTime { found: 1, .. })))
    );
    assert!(err.is_fatal());
    assert_eq!(tx.state(), TxState::Unsigned);
}

#[tokio::test]
async fn test_sign_incomplete() {
    let server = mock_daemon(|method, params| match method {
        "createrawtransaction" => Ok(json!(LEGACY_UNSIGNED)),
        "signrawtransactionwithkey" => Ok(json!({
            "hex": LEGACY_UNSIGNED,
            "complete": false,
            "errors": [{
                "txid": "ce9ea9f6f5e422c6a9dbcddb3b9a14d1c78fab9ab520cb281aa2a74a09575da1",
                "vout": 1, "scriptSig": "", "sequence": 4294967295u32,
                "error": "Unable to sign input, invalid stack size (possibly missing key)"
            }]
        })),
        _ => bitcoind("main", method, params),
    })
    .await;
    let rpc = connect(&server).await;

    let mut tx = legacy_model();
    tx_ops::create_raw(&mut tx, &rpc).await.unwrap();
    let err = tx_ops::sign(&mut tx, &rpc, &[]).await.unwrap_err();
    assert_matches!(&err, Error::Sign(msg) if msg.contains("possibly missing key"));
    assert_eq!(tx.state(), TxState::Unsigned);

    // signing twice is refused before the daemon is asked
    let mut signed = legacy_model();
    signed.set_raw_hex(LEGACY_UNSIGNED).unwrap();
    signed.accept_signed_hex(LEGACY_TX).unwrap();
    assert_matches!(tx_ops::sign(&mut signed, &rpc, &[]).await, Err(Error::Sign(_)));
}

#[tokio::test]
async fn test_send_refused_when_confirmed() {
    let server = mock_daemon(|method, params| match method {
        "getmempoolentry" => absent(),
        "gettransaction" => Ok(json!({"txid": LEGACY_TXID, "confirmations": 3})),
        _ => mainnet_node(LEGACY_TX)(method, params),
    })
    .await;
    let rpc = connect(&server).await;

    let mut tx = legacy_model();
    tx.set_raw_hex(LEGACY_UNSIGNED).unwrap();
    tx.accept_signed_hex(LEGACY_TX).unwrap();
    assert_matches!(tx_ops::send(&mut tx, &rpc).await, Err(Error::Status(TxStatus::Confirmed(3))));
    assert_eq!(tx.state(), TxState::Signed);
    assert!(!received_methods(&server).await.contains(&"sendrawtransaction".to_string()));
}

#[tokio::test]
async fn test_status_in_mempool_still_sendable() {
    let server = mock_daemon(|method, params| match method {
        "getmempoolentry" => Ok(json!({"size": 191, "vsize": 191})),
        _ => mainnet_node(LEGACY_TX)(method, params),
    })
    .await;
    let rpc = connect(&server).await;

    let mut tx = legacy_model();
    tx.set_raw_hex(LEGACY_UNSIGNED).unwrap();
    tx.accept_signed_hex(LEGACY_TX).unwrap();
    assert_eq!(tx_ops::check_sendable(&tx, &rpc).await.unwrap(), TxStatus::InMempool);
}

#[tokio::test]
async fn test_status_in_chain_not_wallet() {
    let server = mock_daemon(|method, params| match method {
        "getrawtransaction" => Ok(json!({"txid": LEGACY_TXID, "confirmations": 10})),
        _ => mainnet_node(LEGACY_TX)(method, params),
    })
    .await;
    let rpc = connect(&server).await;

    let mut tx = legacy_model();
    tx.set_raw_hex(LEGACY_UNSIGNED).unwrap();
    tx.accept_signed_hex(LEGACY_TX).unwrap();
    let status = tx_ops::get_status(&tx, &rpc).await.unwrap();
    assert_eq!(status, TxStatus::InBlockchainNotWallet);
    assert_eq!(status.exit_code(), 2);
}

#[tokio::test]
async fn test_send_failure_hint() {
    let server = mock_daemon(|method, params| match method {
        "sendrawtransaction" => Err((-26, "mandatory-script-verify-flag-failed (Signature must use SIGHASH_FORKID)".into())),
        _ => mainnet_node(LEGACY_TX)(method, params),
    })
    .await;
    let rpc = connect(&server).await;

    let mut tx = legacy_model();
    tx.set_raw_hex(LEGACY_UNSIGNED).unwrap();
    tx.accept_signed_hex(LEGACY_TX).unwrap();
    let err = tx_ops::send(&mut tx, &rpc).await.unwrap_err();
    assert_matches!(&err, Error::Send(msg) if msg.contains("UAHF has activated"));
    assert_eq!(tx.state(), TxState::Signed);
}

#[tokio::test]
async fn test_relay_fee() {
    let server = mock_daemon(|m, p| bitcoind("regtest", m, p)).await;
    let config = config_for(&server, btc(Network::Regtest), BackendKind::Reqwest);
    let rpc = BitcoinRpcClient::connect(&config).await.unwrap();
    assert_eq!(tx_ops::get_relay_fee(&rpc).await.unwrap(), Amount::from_sat(1000));
}
