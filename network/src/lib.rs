// SPDX-License-Identifier: CC0-1.0

//! Coin and network types shared across coldwallet crates.
//!
//! The [`Protocol`] type pairs a [`Coin`] with a [`Network`] and answers every
//! chain-specific question the rest of the workspace needs: address version
//! bytes, genesis and fork block hashes, fee ceilings, daemon defaults.

use std::fmt;

use thiserror::Error;

pub mod protocol;

pub use protocol::{DaemonId, Fork, Protocol};

/// The chain network to act on.
#[derive(Copy, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Network {
    /// Production chain.
    #[default]
    Mainnet,
    /// Public test chain.
    Testnet,
    /// Local regression-test chain.
    Regtest,
}

impl Network {
    /// Whether this is anything other than mainnet.
    pub fn is_testnet(self) -> bool {
        self != Network::Mainnet
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
            Network::Regtest => write!(f, "regtest"),
        }
    }
}

impl std::str::FromStr for Network {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            _ => Err(ParseError::UnknownNetwork(s.to_string())),
        }
    }
}

/// Base protocol family of a coin.
#[derive(Copy, PartialEq, Eq, Clone, Hash, Debug)]
pub enum Family {
    /// UTXO chains speaking the Bitcoin Core RPC dialect.
    Bitcoin,
    /// Account chains speaking the Ethereum JSON-RPC dialect.
    Ethereum,
    /// Monero daemon and wallet RPC.
    Monero,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Family::Bitcoin => write!(f, "Bitcoin"),
            Family::Ethereum => write!(f, "Ethereum"),
            Family::Monero => write!(f, "Monero"),
        }
    }
}

/// Supported coins.
#[derive(Copy, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Coin {
    Btc,
    Ltc,
    Bch,
    Eth,
    Etc,
    Xmr,
}

impl Coin {
    /// All supported coins.
    pub const ALL: [Coin; 6] = [Coin::Btc, Coin::Ltc, Coin::Bch, Coin::Eth, Coin::Etc, Coin::Xmr];

    /// Upper-case ticker symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Coin::Btc => "BTC",
            Coin::Ltc => "LTC",
            Coin::Bch => "BCH",
            Coin::Eth => "ETH",
            Coin::Etc => "ETC",
            Coin::Xmr => "XMR",
        }
    }

    /// Human-readable coin name.
    pub fn name(self) -> &'static str {
        match self {
            Coin::Btc => "Bitcoin",
            Coin::Ltc => "Litecoin",
            Coin::Bch => "BitcoinCash",
            Coin::Eth => "Ethereum",
            Coin::Etc => "EthereumClassic",
            Coin::Xmr => "Monero",
        }
    }

    pub fn family(self) -> Family {
        match self {
            Coin::Btc | Coin::Ltc | Coin::Bch => Family::Bitcoin,
            Coin::Eth | Coin::Etc => Family::Ethereum,
            Coin::Xmr => Family::Monero,
        }
    }

    /// Number of decimal places of the smallest coin unit.
    pub fn decimals(self) -> u32 {
        match self {
            Coin::Btc | Coin::Ltc | Coin::Bch => 8,
            Coin::Eth | Coin::Etc => 18,
            Coin::Xmr => 12,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl std::str::FromStr for Coin {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Coin::ALL
            .into_iter()
            .find(|c| c.symbol().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::UnknownCoin(s.to_string()))
    }
}

/// Errors raised while parsing coin, network or chain identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown network type: {0}")]
    UnknownNetwork(String),

    #[error("Unknown coin: {0}")]
    UnknownCoin(String),

    #[error("Unknown chain '{chain}' for coin {coin}")]
    UnknownChain {
        coin: Coin,
        chain: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_display() {
        assert_eq!(Network::Mainnet.to_string(), "mainnet");
        assert_eq!(Network::Testnet.to_string(), "testnet");
        assert_eq!(Network::Regtest.to_string(), "regtest");
    }

    #[test]
    fn test_network_from_str() {
        assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("main".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("TEST".parse::<Network>().unwrap(), Network::Testnet);
        assert_eq!("regtest".parse::<Network>().unwrap(), Network::Regtest);
        assert!("signet".parse::<Network>().is_err());
    }

    #[test]
    fn test_coin_from_str() {
        assert_eq!("btc".parse::<Coin>().unwrap(), Coin::Btc);
        assert_eq!("XMR".parse::<Coin>().unwrap(), Coin::Xmr);
        assert_eq!("Bch".parse::<Coin>().unwrap(), Coin::Bch);
        assert_eq!("doge".parse::<Coin>(), Err(ParseError::UnknownCoin("doge".into())));
    }

    #[test]
    fn test_coin_family() {
        assert_eq!(Coin::Ltc.family(), Family::Bitcoin);
        assert_eq!(Coin::Etc.family(), Family::Ethereum);
        assert_eq!(Coin::Xmr.family(), Family::Monero);
        assert_eq!(Coin::Btc.decimals(), 8);
        assert_eq!(Coin::Xmr.decimals(), 12);
    }
}
