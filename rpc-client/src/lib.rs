// SPDX-License-Identifier: CC0-1.0

//! JSON-RPC client for Bitcoin-family, Ethereum-family and Monero daemons.
//!
//! The client never trusts the daemon with the wallet's money: hex it
//! returns is decoded and checked against the wallet's transaction model,
//! and the daemon's chain is verified at connect time.
//!
//! # Example
//!
//! ```no_run
//! use coldwallet::{Coin, Network, Protocol};
//! use coldwallet_rpc::{Config, DaemonClient, RpcClientBuilder};
//!
//! # async fn run() -> coldwallet_rpc::Result<()> {
//! let config = Config::new(Protocol::new(Coin::Btc, Network::Regtest));
//! let client = RpcClientBuilder::new(&config)?.connect().await?;
//! if let DaemonClient::Bitcoin(btc) = &client {
//!     println!("{} blocks", btc.blockcount);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod backend;
pub mod bitcoin;
pub mod call_sigs;
pub mod client;
pub mod config;
pub mod error;
pub mod ethereum;
pub mod init;
pub mod monero;
pub mod tx_ops;

pub use auth::{Auth, AuthType};
pub use backend::BackendKind;
pub use bitcoin::BitcoinRpcClient;
pub use call_sigs::{CallSigs, ICall};
pub use client::{CallOptions, Capability, RpcClient};
pub use config::Config;
pub use error::{Error, Result, RpcError, RpcResult};
pub use ethereum::EthereumRpcClient;
pub use init::{DaemonClient, RpcClientBuilder};
pub use monero::{MoneroConnectOptions, MoneroRpcClient, MoneroRpcClientRaw, MoneroWalletRpcClient};
pub use tx_ops::TxStatus;
