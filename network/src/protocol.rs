// SPDX-License-Identifier: CC0-1.0

//! Per-chain protocol constants.
//!
//! Genesis and fork hashes are used by the RPC client to make sure it is
//! talking to the chain the wallet believes it is on.

use std::fmt;

use crate::{Coin, Family, Network, ParseError};

/// A chain split the wallet must be able to tell apart.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Fork {
    /// Height of the first block after the split.
    pub height: u64,
    /// Hash of the block at `height` on *this* chain.
    pub hash: &'static str,
    /// Name of the chain on the other side of the split.
    pub name: &'static str,
    /// Whether transactions are replayable across the split.
    pub replayable: bool,
}

const BTC_MAINNET_GENESIS: &str = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";
const BTC_TESTNET_GENESIS: &str = "000000000933ea01ad0ee984209779baaec3ced90fa3f408719526f8d77f4943";
const BTC_REGTEST_GENESIS: &str = "0f9188f13cb7b2c71f2a335e3a4fc328bf5beb436012afca590b1a11466e2206";
const LTC_MAINNET_GENESIS: &str = "12a765e31ffd4059bada1e25190f6e98c99d9714d334efa41a195a7e7e04bfe2";
const LTC_TESTNET_GENESIS: &str = "4966625a4b2851d9fdee139e56211a0d88575f59ed816ff5e6a63deb4e3e29a0";
const LTC_REGTEST_GENESIS: &str = "530827f38f93b43ed12af0b3ad25a288dc02ed74d6d7857862df51fc56c416f9";
const ETH_MAINNET_GENESIS: &str = "d4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa3";

const BTC_FORKS: &[Fork] = &[Fork {
    height: 478559,
    hash: "00000000000000000019f112ec0a9982926f1258cdcc558dd7c3b7e5dc7fa148",
    name: "BCH",
    replayable: false,
}];

const BCH_FORKS: &[Fork] = &[Fork {
    height: 478559,
    hash: "000000000000000000651ef99cb9fcbe0dadde1d424bd9f15ff20136191a5eec",
    name: "BTC",
    replayable: false,
}];

/// Identifies the daemon implementation behind an RPC endpoint.
///
/// Different implementations of the same protocol family disagree on
/// positional parameter lists, so call signatures are keyed on this.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DaemonId {
    BitcoinCore,
    LitecoinCore,
    BitcoinCashNode,
    OpenEthereum,
    Monerod,
    MoneroWalletRpc,
}

impl DaemonId {
    /// Display name of the daemon.
    pub fn coind_name(self) -> &'static str {
        match self {
            DaemonId::BitcoinCore => "Bitcoin Core",
            DaemonId::LitecoinCore => "Litecoin Core",
            DaemonId::BitcoinCashNode => "Bitcoin Cash Node",
            DaemonId::OpenEthereum => "OpenEthereum",
            DaemonId::Monerod => "Monerod",
            DaemonId::MoneroWalletRpc => "Monero Wallet RPC",
        }
    }

    /// Highest daemon version this wallet was tested against, in the daemon's
    /// own numeric format.
    pub fn tested_version(self) -> Option<u64> {
        match self {
            DaemonId::BitcoinCore => Some(260000),
            DaemonId::LitecoinCore => Some(210300),
            DaemonId::BitcoinCashNode => Some(27010000),
            DaemonId::OpenEthereum => Some(3003005),
            DaemonId::Monerod | DaemonId::MoneroWalletRpc => None,
        }
    }

    pub fn tested_version_str(self) -> &'static str {
        match self {
            DaemonId::BitcoinCore => "26.0.0",
            DaemonId::LitecoinCore => "0.21.3",
            DaemonId::BitcoinCashNode => "27.1.0",
            DaemonId::OpenEthereum => "3.3.5",
            DaemonId::Monerod | DaemonId::MoneroWalletRpc => "0.18",
        }
    }
}

impl fmt::Display for DaemonId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            DaemonId::BitcoinCore => "bitcoin_core",
            DaemonId::LitecoinCore => "litecoin_core",
            DaemonId::BitcoinCashNode => "bitcoin_cash_node",
            DaemonId::OpenEthereum => "openethereum",
            DaemonId::Monerod => "monerod",
            DaemonId::MoneroWalletRpc => "monero_wallet_rpc",
        };
        f.write_str(s)
    }
}

/// A coin on a particular network.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Protocol {
    coin: Coin,
    network: Network,
}

impl Protocol {
    pub fn new(coin: Coin, network: Network) -> Self {
        Self {
            coin,
            network,
        }
    }

    pub fn coin(&self) -> Coin {
        self.coin
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn family(&self) -> Family {
        self.coin.family()
    }

    pub fn is_testnet(&self) -> bool {
        self.network.is_testnet()
    }

    pub fn decimals(&self) -> u32 {
        self.coin.decimals()
    }

    /// Protocol name as used in messages, e.g. `BitcoinTestnet`.
    pub fn cls_name(&self) -> String {
        match self.network {
            Network::Mainnet => self.coin.name().to_string(),
            Network::Testnet => format!("{}Testnet", self.coin.name()),
            Network::Regtest => format!("{}Regtest", self.coin.name()),
        }
    }

    /// The daemon implementation serving this protocol.
    pub fn daemon_id(&self) -> DaemonId {
        match self.coin {
            Coin::Btc => DaemonId::BitcoinCore,
            Coin::Ltc => DaemonId::LitecoinCore,
            Coin::Bch => DaemonId::BitcoinCashNode,
            Coin::Eth | Coin::Etc => DaemonId::OpenEthereum,
            Coin::Xmr => DaemonId::Monerod,
        }
    }

    /// Chain name as reported by a daemon serving this protocol, after
    /// normalization by the RPC client.
    pub fn chain_name(&self) -> &'static str {
        match (self.coin.family(), self.coin, self.network) {
            (Family::Ethereum, Coin::Etc, Network::Mainnet) => "classic",
            (Family::Ethereum, Coin::Etc, Network::Testnet) => "kotti",
            (Family::Ethereum, _, Network::Mainnet) => "foundation",
            (Family::Ethereum, _, Network::Testnet) => "kovan",
            (Family::Ethereum, _, Network::Regtest) => "developmentchain",
            (_, _, Network::Mainnet) => "mainnet",
            (_, _, Network::Testnet) => "testnet",
            (_, _, Network::Regtest) => "regtest",
        }
    }

    /// Inverse of [`Protocol::chain_name`].
    pub fn from_chain_name(coin: Coin, chain: &str) -> Result<Self, ParseError> {
        let chain = chain.to_lowercase();
        [Network::Mainnet, Network::Testnet, Network::Regtest]
            .into_iter()
            .map(|network| Protocol::new(coin, network))
            .find(|proto| proto.chain_name() == chain)
            .ok_or(ParseError::UnknownChain {
                coin,
                chain,
            })
    }

    /// Hash of block zero, where the wallet knows it.
    pub fn genesis_hash(&self) -> Option<&'static str> {
        match (self.coin, self.network) {
            (Coin::Btc | Coin::Bch, Network::Mainnet) => Some(BTC_MAINNET_GENESIS),
            (Coin::Btc | Coin::Bch, Network::Testnet) => Some(BTC_TESTNET_GENESIS),
            (Coin::Btc | Coin::Bch, Network::Regtest) => Some(BTC_REGTEST_GENESIS),
            (Coin::Ltc, Network::Mainnet) => Some(LTC_MAINNET_GENESIS),
            (Coin::Ltc, Network::Testnet) => Some(LTC_TESTNET_GENESIS),
            (Coin::Ltc, Network::Regtest) => Some(LTC_REGTEST_GENESIS),
            (Coin::Eth | Coin::Etc, Network::Mainnet) => Some(ETH_MAINNET_GENESIS),
            _ => None,
        }
    }

    /// Chain splits to verify on connect. Only mainnet carries any.
    pub fn forks(&self) -> &'static [Fork] {
        match (self.coin, self.network) {
            (Coin::Btc, Network::Mainnet) => BTC_FORKS,
            (Coin::Bch, Network::Mainnet) => BCH_FORKS,
            _ => &[],
        }
    }

    /// Base58Check version byte of pay-to-public-key-hash addresses.
    pub fn p2pkh_version(&self) -> u8 {
        match (self.coin, self.network) {
            (Coin::Ltc, Network::Mainnet) => 0x30,
            (_, Network::Mainnet) => 0x00,
            _ => 0x6f,
        }
    }

    /// Base58Check version byte of pay-to-script-hash addresses.
    pub fn p2sh_version(&self) -> u8 {
        match (self.coin, self.network) {
            (Coin::Ltc, Network::Mainnet) => 0x32,
            (Coin::Ltc, _) => 0x3a,
            (_, Network::Mainnet) => 0x05,
            _ => 0xc4,
        }
    }

    /// Upper bound on a transaction fee, in minimal units.
    pub fn max_tx_fee(&self) -> Option<u64> {
        match self.coin {
            Coin::Btc => Some(300_000),
            Coin::Ltc => Some(30_000_000),
            Coin::Bch => Some(10_000_000),
            Coin::Eth | Coin::Etc => Some(5_000_000_000_000_000),
            Coin::Xmr => None,
        }
    }

    /// Sighash type passed to the daemon when signing.
    pub fn sighash_type(&self) -> &'static str {
        match self.coin {
            Coin::Bch => "ALL|FORKID",
            _ => "ALL",
        }
    }

    pub fn supports_segwit(&self) -> bool {
        matches!(self.coin, Coin::Btc | Coin::Ltc)
    }

    /// Average block interval in seconds.
    pub fn secs_per_block(&self) -> u64 {
        match self.coin {
            Coin::Btc | Coin::Bch => 600,
            Coin::Ltc => 150,
            Coin::Eth | Coin::Etc => 15,
            Coin::Xmr => 120,
        }
    }

    /// Default daemon RPC port.
    pub fn rpc_port(&self) -> u16 {
        match (self.coin, self.network) {
            (Coin::Btc, Network::Mainnet) => 8332,
            (Coin::Btc, Network::Testnet) => 18332,
            (Coin::Btc, Network::Regtest) => 18443,
            (Coin::Ltc, Network::Mainnet) => 9332,
            (Coin::Ltc, Network::Testnet) => 19332,
            (Coin::Ltc, Network::Regtest) => 19443,
            (Coin::Bch, Network::Mainnet) => 8432,
            (Coin::Bch, Network::Testnet) => 18432,
            (Coin::Bch, Network::Regtest) => 18543,
            (Coin::Eth | Coin::Etc, _) => 8545,
            (Coin::Xmr, Network::Mainnet) => 18081,
            (Coin::Xmr, Network::Testnet) => 28081,
            (Coin::Xmr, Network::Regtest) => 38081,
        }
    }

    /// Default Monero wallet RPC port.
    pub fn wallet_rpc_port(&self) -> Option<u16> {
        match (self.coin, self.network) {
            (Coin::Xmr, Network::Mainnet) => Some(13131),
            (Coin::Xmr, _) => Some(13141),
            _ => None,
        }
    }

    /// Daemon data directory name under the user's home directory.
    pub fn datadir_name(&self) -> &'static str {
        match self.coin {
            Coin::Btc => ".bitcoin",
            Coin::Ltc => ".litecoin",
            Coin::Bch => ".bitcoin-bchn",
            Coin::Eth | Coin::Etc => ".local/share/io.parity.ethereum",
            Coin::Xmr => ".bitmonero",
        }
    }

    /// Network-specific subdirectory of the data directory holding the
    /// auth cookie.
    pub fn data_subdir(&self) -> &'static str {
        match (self.coin, self.network) {
            (_, Network::Mainnet) => "",
            (Coin::Ltc, Network::Testnet) => "testnet4",
            (_, Network::Testnet) => "testnet3",
            (_, Network::Regtest) => "regtest",
        }
    }

    /// Daemon configuration file name inside the data directory.
    pub fn cfg_file(&self) -> &'static str {
        match self.coin {
            Coin::Btc | Coin::Bch => "bitcoin.conf",
            Coin::Ltc => "litecoin.conf",
            Coin::Eth | Coin::Etc => "config.toml",
            Coin::Xmr => "bitmonero.conf",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.cls_name())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_chain_name_round_trip() {
        for coin in Coin::ALL {
            for network in [Network::Mainnet, Network::Testnet, Network::Regtest] {
                let proto = Protocol::new(coin, network);
                let parsed = Protocol::from_chain_name(coin, proto.chain_name()).unwrap();
                assert_eq!(parsed, proto);
            }
        }
        assert_matches!(
            Protocol::from_chain_name(Coin::Btc, "signet"),
            Err(ParseError::UnknownChain { .. })
        );
    }

    #[test]
    fn test_forks_mainnet_only() {
        let btc = Protocol::new(Coin::Btc, Network::Mainnet);
        assert_eq!(btc.forks().len(), 1);
        assert_eq!(btc.forks()[0].name, "BCH");
        assert!(Protocol::new(Coin::Btc, Network::Testnet).forks().is_empty());
        let bch = Protocol::new(Coin::Bch, Network::Mainnet);
        assert_ne!(bch.forks()[0].hash, btc.forks()[0].hash);
        assert_eq!(bch.genesis_hash(), btc.genesis_hash());
    }

    #[test]
    fn test_version_bytes() {
        assert_eq!(Protocol::new(Coin::Btc, Network::Mainnet).p2pkh_version(), 0x00);
        assert_eq!(Protocol::new(Coin::Btc, Network::Regtest).p2sh_version(), 0xc4);
        assert_eq!(Protocol::new(Coin::Ltc, Network::Mainnet).p2pkh_version(), 0x30);
        assert_eq!(Protocol::new(Coin::Ltc, Network::Testnet).p2sh_version(), 0x3a);
    }

    #[test]
    fn test_daemon_ids() {
        assert_eq!(Protocol::new(Coin::Bch, Network::Mainnet).daemon_id(), DaemonId::BitcoinCashNode);
        assert_eq!(DaemonId::LitecoinCore.to_string(), "litecoin_core");
        assert_eq!(Protocol::new(Coin::Bch, Network::Mainnet).sighash_type(), "ALL|FORKID");
        assert!(!Protocol::new(Coin::Bch, Network::Mainnet).supports_segwit());
        assert_eq!(Protocol::new(Coin::Ltc, Network::Regtest).cls_name(), "LitecoinRegtest");
    }
}
