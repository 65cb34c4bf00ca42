// SPDX-License-Identifier: CC0-1.0

//! Error types for the command-line tools and their exit statuses.

use std::io;

use thiserror::Error;

/// Main error type for the binaries.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Rpc(#[from] coldwallet_rpc::Error),

    #[error(transparent)]
    Wallet(#[from] coldwallet::Error),

    #[error("{path}: {reason}")]
    KeyAddrFile {
        path: String,
        reason: String,
    },

    #[error("{path}: {reason}")]
    TxFile {
        path: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Aborted by user")]
    Aborted,
}

impl From<coldwallet_rpc::RpcError> for CliError {
    fn from(err: coldwallet_rpc::RpcError) -> Self {
        CliError::Rpc(err.into())
    }
}

impl From<coldwallet::TxFileError> for CliError {
    fn from(err: coldwallet::TxFileError) -> Self {
        CliError::Wallet(err.into())
    }
}

impl From<coldwallet::TxError> for CliError {
    fn from(err: coldwallet::TxError) -> Self {
        CliError::Wallet(err.into())
    }
}

impl From<coldwallet::DecodeError> for CliError {
    fn from(err: coldwallet::DecodeError) -> Self {
        CliError::Wallet(err.into())
    }
}

impl CliError {
    pub fn category(&self) -> &'static str {
        match self {
            CliError::Usage(_) | CliError::Aborted => "usage",
            CliError::Rpc(e) => e.category(),
            CliError::Wallet(e) if e.is_untrusted_data() => "integrity",
            CliError::Wallet(coldwallet::Error::TxFile(_) | coldwallet::Error::Io(_)) => "file",
            CliError::Wallet(_) => "transaction",
            CliError::KeyAddrFile {
                ..
            }
            | CliError::TxFile {
                ..
            }
            | CliError::Io(_)
            | CliError::Json(_) => "file",
            CliError::Logging(_) => "usage",
        }
    }

    /// Process exit status: 3 for untrusted data, 2 for chain identity and
    /// file problems, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            "integrity" => 3,
            "chain" | "file" => 2,
            _ => 1,
        }
    }
}

/// Logging-related errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Subscriber initialization failed: {0}")]
    SubscriberInit(String),
}

pub type CliResult<T> = std::result::Result<T, CliError>;

pub type LoggingResult<T> = std::result::Result<T, LoggingError>;
