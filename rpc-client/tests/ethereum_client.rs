//! Connect handshake against a mock OpenEthereum node.

mod common;

use assert_matches::assert_matches;
use coldwallet::{Coin, Network, Protocol};
use coldwallet_rpc::{BackendKind, Capability, DaemonClient, Error, RpcClientBuilder, RpcError};
use serde_json::{Value, json};

use common::{Reply, config_for, mock_daemon, not_found, received_methods};

fn parity(chain: &'static str, minor: u64, chain_id: bool) -> impl Fn(&str, &Value) -> Reply + Send + Sync + 'static {
    move |method: &str, _: &Value| {
        Ok(match method {
            "eth_blockNumber" => json!("0x1b4"),
            "parity_versionInfo" => json!({"version": {"major": 3, "minor": minor, "patch": 5}, "track": "stable"}),
            "parity_getBlockHeaderByNumber" => json!({"timestamp": "0x6553f100", "number": "0x1b4"}),
            "parity_chain" => json!(chain),
            "parity_nodeKind" => json!({"capability": "full", "availability": "personal"}),
            "eth_chainId" if chain_id => json!("0x11"),
            _ => return not_found(),
        })
    }
}

#[tokio::test]
async fn test_connect_dev_chain() {
    let server = mock_daemon(parity("developmentchain", 3, true)).await;
    let config = config_for(&server, Protocol::new(Coin::Eth, Network::Regtest), BackendKind::Reqwest);

    let client = RpcClientBuilder::new(&config).unwrap().connect().await.unwrap();
    assert_eq!(client.blockcount(), 436);
    assert_eq!(client.chain(), "developmentchain");
    assert_eq!(client.daemon_version_str(), "3.3.5");

    let DaemonClient::Ethereum(eth) = client else {
        panic!("expected an Ethereum client");
    };
    assert_eq!(eth.cur_date, 1_700_000_000);
    assert!(eth.has_cap(Capability::FullNode));
    assert!(eth.has_cap(Capability::EthChainId));

    let methods = received_methods(&server).await;
    assert_eq!(methods[0], "eth_blockNumber");
    assert_eq!(methods.last().map(String::as_str), Some("eth_chainId"));

    assert_matches!(eth.call("eth_sendTransaction", json!([])).await, Err(RpcError::UnknownMethod(_)));
}

#[tokio::test]
async fn test_no_chain_id_and_not_bitcoin() {
    let server = mock_daemon(parity("classic", 3, false)).await;
    let config = config_for(&server, Protocol::new(Coin::Etc, Network::Mainnet), BackendKind::Raw);

    let client = RpcClientBuilder::new(&config).unwrap().connect().await.unwrap();
    assert_eq!(client.chain(), "classic");
    assert_matches!(client.into_bitcoin("sign"), Err(Error::Config(msg)) if msg.contains("'sign'"));
}

#[tokio::test]
async fn test_chain_and_version_checks() {
    let server = mock_daemon(parity("kovan", 3, true)).await;
    let config = config_for(&server, Protocol::new(Coin::Eth, Network::Mainnet), BackendKind::Reqwest);
    let err = RpcClientBuilder::new(&config).unwrap().connect().await.unwrap_err();
    assert_matches!(err, Error::Rpc(RpcError::ChainMismatch { ref found, .. }) if found == "KOVAN");

    let server = mock_daemon(parity("foundation", 4, true)).await;
    let config = config_for(&server, Protocol::new(Coin::Eth, Network::Mainnet), BackendKind::Reqwest);
    assert!(RpcClientBuilder::new(&config).unwrap().connect().await.is_ok());

    let config = config.with_strict_daemon_version(true);
    let err = RpcClientBuilder::new(&config).unwrap().connect().await.unwrap_err();
    assert_matches!(err, Error::Rpc(RpcError::UnsupportedDaemonVersion { tested: "3.3.5", .. }));
}
