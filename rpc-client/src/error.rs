// SPDX-License-Identifier: CC0-1.0

//! Error types for the RPC client.

use std::io;

use thiserror::Error;

use crate::tx_ops::TxStatus;

/// Main error type for the RPC client and the wallet operations built on it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] coldwallet::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Signing failed: {0}")]
    Sign(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Transaction has Segwit outputs, but this blockchain does not support Segwit at the current height")]
    SegwitInactive,

    #[error("{0}")]
    Status(TxStatus),
}

impl From<coldwallet::TxError> for Error {
    fn from(err: coldwallet::TxError) -> Self {
        Error::Wallet(err.into())
    }
}

impl From<coldwallet::IntegrityError> for Error {
    fn from(err: coldwallet::IntegrityError) -> Self {
        Error::Wallet(err.into())
    }
}

impl From<coldwallet::DecodeError> for Error {
    fn from(err: coldwallet::DecodeError) -> Self {
        Error::Wallet(err.into())
    }
}

impl From<coldwallet::AmountError> for Error {
    fn from(err: coldwallet::AmountError) -> Self {
        Error::Wallet(err.into())
    }
}

impl Error {
    /// Returns a static string representing the error category
    pub fn category(&self) -> &'static str {
        match self {
            Error::Rpc(e) => e.category(),
            Error::Wallet(e) if e.is_untrusted_data() => "integrity",
            Error::Wallet(coldwallet::Error::TxFile(_) | coldwallet::Error::Io(_)) => "file",
            Error::Wallet(coldwallet::Error::Tx(coldwallet::TxError::WrongChain { .. })) => "chain",
            Error::Wallet(_) => "transaction",
            Error::Config(_) => "config",
            Error::Sign(_) | Error::Send(_) => "daemon",
            Error::SegwitInactive => "chain",
            Error::Status(_) => "status",
        }
    }

    /// Errors after which nothing should be retried or continued, because
    /// the daemon or the data it returned cannot be trusted.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Rpc(e) => e.is_fatal(),
            Error::Wallet(e) => e.is_untrusted_data(),
            _ => false,
        }
    }
}

/// Transport, authentication and daemon identity errors.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The daemon answered, but with an error.
    #[error("{}", fmt_failure(.status, .message))]
    Failure {
        status: Option<u16>,
        message: String,
    },

    #[error("Unable to connect to {host}:{port}")]
    Socket {
        host: String,
        port: u16,
    },

    #[error("{0}")]
    Credentials(String),

    #[error("{proto} protocol chain is {expected}, but coin daemon chain is {found}")]
    ChainMismatch {
        proto: String,
        expected: String,
        found: String,
    },

    #[error("{reason}\n'{coin}' requested, but this is not the {coin} chain!")]
    WrongChain {
        coin: String,
        reason: String,
    },

    #[error(
        "The running {daemon} daemon has version {version}. This version of the wallet is tested only on {daemon} v{tested} and below."
    )]
    UnsupportedDaemonVersion {
        daemon: &'static str,
        version: String,
        tested: &'static str,
    },

    #[error("More than one {daemon} wallet loaded: {wallets:?}")]
    WalletAmbiguity {
        daemon: &'static str,
        wallets: Vec<String>,
    },

    #[error("'{0}': method not supported by this client")]
    UnknownMethod(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),
}

fn fmt_failure(status: &Option<u16>, message: &str) -> String {
    match *status {
        Some(code) => {
            let reason = reqwest::StatusCode::from_u16(code)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Unknown Status");
            format!("{} {}: {}", code, reason, message)
        }
        None => message.to_string(),
    }
}

impl RpcError {
    pub fn failure(message: impl Into<String>) -> Self {
        RpcError::Failure {
            status: None,
            message: message.into(),
        }
    }

    /// Message text of a daemon failure, if this is one.
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            RpcError::Failure {
                message,
                ..
            } => Some(message),
            _ => None,
        }
    }

    /// Returns a static string representing the error category
    pub fn category(&self) -> &'static str {
        match self {
            RpcError::Failure {
                ..
            }
            | RpcError::UnknownMethod(_) => "daemon",
            RpcError::Socket {
                ..
            }
            | RpcError::Timeout
            | RpcError::Http(_)
            | RpcError::Io(_)
            | RpcError::Backend(_) => "transport",
            RpcError::Json(_) => "protocol",
            RpcError::Credentials(_) => "credentials",
            RpcError::ChainMismatch {
                ..
            }
            | RpcError::WrongChain {
                ..
            } => "chain",
            RpcError::UnsupportedDaemonVersion {
                ..
            } => "version",
            RpcError::WalletAmbiguity {
                ..
            } => "wallet",
        }
    }

    /// Connecting to the wrong chain is never recoverable.
    pub fn is_fatal(&self) -> bool {
        self.category() == "chain"
    }
}

/// Type alias for Result with the main error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Type alias for RPC transport results.
pub type RpcResult<T> = std::result::Result<T, RpcError>;
