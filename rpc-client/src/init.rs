// SPDX-License-Identifier: CC0-1.0

//! Two-phase client construction: configure, then connect and verify.

use coldwallet_network::{DaemonId, Family, Protocol};

use crate::bitcoin::BitcoinRpcClient;
use crate::config::Config;
use crate::error::{Error, Result, RpcError};
use crate::ethereum::EthereumRpcClient;

/// A connected daemon of any supported family.
#[derive(Debug)]
pub enum DaemonClient {
    Bitcoin(BitcoinRpcClient),
    Ethereum(EthereumRpcClient),
}

impl DaemonClient {
    pub fn proto(&self) -> &Protocol {
        match self {
            DaemonClient::Bitcoin(c) => c.proto(),
            DaemonClient::Ethereum(c) => c.proto(),
        }
    }

    pub fn daemon(&self) -> DaemonId {
        self.proto().daemon_id()
    }

    /// Normalized chain name reported by the daemon.
    pub fn chain(&self) -> &str {
        match self {
            DaemonClient::Bitcoin(c) => &c.chain,
            DaemonClient::Ethereum(c) => &c.chain,
        }
    }

    pub fn blockcount(&self) -> u64 {
        match self {
            DaemonClient::Bitcoin(c) => c.blockcount,
            DaemonClient::Ethereum(c) => c.blockcount,
        }
    }

    pub fn daemon_version(&self) -> u64 {
        match self {
            DaemonClient::Bitcoin(c) => c.daemon_version(),
            DaemonClient::Ethereum(c) => c.daemon_version(),
        }
    }

    pub fn daemon_version_str(&self) -> String {
        match self {
            DaemonClient::Bitcoin(c) => c.daemon_version_str().to_string(),
            DaemonClient::Ethereum(c) => c.daemon_version_str(),
        }
    }

    /// The Bitcoin-family client, or a configuration error naming `op`.
    pub fn into_bitcoin(self, op: &str) -> Result<BitcoinRpcClient> {
        match self {
            DaemonClient::Bitcoin(c) => Ok(c),
            other => Err(Error::Config(format!(
                "'{}' is not supported for the {} protocol",
                op,
                other.proto().cls_name()
            ))),
        }
    }
}

/// Validates configuration up front; [`RpcClientBuilder::connect`] does the
/// network work.
#[derive(Debug, Clone)]
pub struct RpcClientBuilder {
    config: Config,
}

impl RpcClientBuilder {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate().map_err(Error::Config)?;
        if config.protocol.family() == Family::Monero {
            return Err(Error::Config(format!(
                "Coin daemon operations not supported for {} protocol!",
                config.protocol.cls_name()
            )));
        }
        Ok(Self {
            config: config.clone(),
        })
    }

    /// Connects, runs the family handshake, then checks the daemon version
    /// and chain against the configured protocol.
    pub async fn connect(self) -> Result<DaemonClient> {
        let client = match self.config.protocol.family() {
            Family::Bitcoin => DaemonClient::Bitcoin(BitcoinRpcClient::connect(&self.config).await?),
            Family::Ethereum => DaemonClient::Ethereum(EthereumRpcClient::connect(&self.config).await?),
            Family::Monero => unreachable!("rejected in new()"),
        };

        check_daemon_version(&client, self.config.strict_daemon_version)?;
        check_chain(&self.config.protocol, client.chain())?;
        tracing::info!(
            "Connected to {} {} on {} at height {}",
            client.daemon().coind_name(),
            client.daemon_version_str(),
            client.chain(),
            client.blockcount()
        );
        Ok(client)
    }
}

fn check_daemon_version(client: &DaemonClient, strict: bool) -> Result<()> {
    let daemon = client.daemon();
    let Some(tested) = daemon.tested_version() else {
        return Ok(());
    };
    if client.daemon_version() <= tested {
        return Ok(());
    }
    if strict {
        return Err(RpcError::UnsupportedDaemonVersion {
            daemon: daemon.coind_name(),
            version: client.daemon_version_str(),
            tested: daemon.tested_version_str(),
        }
        .into());
    }
    tracing::warn!(
        "{} version {} is newer than the last tested version {}",
        daemon.coind_name(),
        client.daemon_version_str(),
        daemon.tested_version_str()
    );
    Ok(())
}

fn check_chain(proto: &Protocol, daemon_chain: &str) -> Result<()> {
    if proto.chain_name() != daemon_chain {
        return Err(RpcError::ChainMismatch {
            proto: proto.cls_name(),
            expected: proto.chain_name().to_uppercase(),
            found: daemon_chain.to_uppercase(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use coldwallet::{Coin, Network};

    use super::*;

    #[test]
    fn test_check_chain() {
        let proto = Protocol::new(Coin::Btc, Network::Testnet);
        assert!(check_chain(&proto, "testnet").is_ok());
        let err = check_chain(&proto, "mainnet").unwrap_err();
        assert_eq!(
            err.to_string(),
            "RPC error: BitcoinTestnet protocol chain is TESTNET, but coin daemon chain is MAINNET"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_builder_rejects_monero() {
        let config = Config::new(Protocol::new(Coin::Xmr, Network::Mainnet));
        assert_matches!(RpcClientBuilder::new(&config), Err(Error::Config(msg)) if msg.contains("not supported"));
    }
}
