// SPDX-License-Identifier: CC0-1.0

//! Configuration for the RPC client and wallet operations.

use std::path::PathBuf;
use std::time::Duration;

use coldwallet::txfile::DEFAULT_MAX_TX_FILE_SIZE;
use coldwallet_network::{Network, Protocol};

use crate::backend::BackendKind;

/// Name of the daemon wallet the client tracks addresses in.
pub const DEFAULT_TRACKING_WALLET: &str = "coldwallet-tracking-wallet";

/// Configuration for the RPC client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Coin and network the wallet operates on.
    pub protocol: Protocol,

    /// Daemon host. Defaults to localhost.
    pub rpc_host: String,

    /// Daemon port. Defaults to the protocol's standard RPC port.
    pub rpc_port: Option<u16>,

    /// Explicit credentials. These override the daemon's config file and
    /// auth cookie.
    pub rpc_user: Option<String>,
    pub rpc_password: Option<String>,

    /// Transport used for requests.
    pub backend: BackendKind,

    /// Default per-request timeout.
    pub http_timeout: Duration,

    /// Daemon data directory. Defaults to the standard location under the
    /// user's home directory.
    pub daemon_data_dir: Option<PathBuf>,

    /// Directory transaction files are written to.
    pub data_dir: PathBuf,

    /// Refuse a daemon newer than any tested release instead of warning.
    pub strict_daemon_version: bool,

    /// Log every payload and response at debug level.
    pub debug_rpc: bool,

    pub max_tx_file_size: usize,

    /// Test hook: requests for this method are sent under a name the daemon
    /// does not know, forcing a failure.
    pub fail_on_command: Option<String>,

    /// Daemon wallet loaded or created on connect. `None` skips the check.
    pub tracking_wallet: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Protocol::new(coldwallet::Coin::Btc, Network::Mainnet))
    }
}

impl Config {
    /// Create a new configuration for the given protocol.
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            rpc_host: "localhost".to_string(),
            rpc_port: None,
            rpc_user: None,
            rpc_password: None,
            backend: BackendKind::Auto,
            http_timeout: Duration::from_secs(60),
            daemon_data_dir: None,
            data_dir: PathBuf::from("."),
            strict_daemon_version: false,
            debug_rpc: false,
            max_tx_file_size: DEFAULT_MAX_TX_FILE_SIZE,
            fail_on_command: None,
            tracking_wallet: Some(DEFAULT_TRACKING_WALLET.to_string()),
        }
    }

    /// Set the daemon host and, optionally, port.
    pub fn with_rpc_host(mut self, host: impl Into<String>, port: Option<u16>) -> Self {
        self.rpc_host = host.into();
        self.rpc_port = port;
        self
    }

    /// Set explicit RPC credentials.
    pub fn with_rpc_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.rpc_user = Some(user.into());
        self.rpc_password = Some(password.into());
        self
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Set the daemon's data directory, where its config file and auth
    /// cookie live.
    pub fn with_daemon_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.daemon_data_dir = Some(dir.into());
        self
    }

    /// Set the directory for transaction files.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_strict_daemon_version(mut self, strict: bool) -> Self {
        self.strict_daemon_version = strict;
        self
    }

    pub fn with_debug_rpc(mut self, enabled: bool) -> Self {
        self.debug_rpc = enabled;
        self
    }

    pub fn with_max_tx_file_size(mut self, max: usize) -> Self {
        self.max_tx_file_size = max;
        self
    }

    pub fn with_fail_on_command(mut self, method: impl Into<String>) -> Self {
        self.fail_on_command = Some(method.into());
        self
    }

    /// Set the tracking wallet name, or `None` to skip the wallet check.
    pub fn with_tracking_wallet(mut self, name: Option<String>) -> Self {
        self.tracking_wallet = name;
        self
    }

    /// Daemon port in effect.
    pub fn port(&self) -> u16 {
        self.rpc_port.unwrap_or_else(|| self.protocol.rpc_port())
    }

    /// Daemon data directory in effect, if one can be determined.
    pub fn daemon_data_dir(&self) -> Option<PathBuf> {
        self.daemon_data_dir.clone().or_else(|| {
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join(self.protocol.datadir_name()))
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.rpc_host.is_empty() {
            return Err("rpc_host must not be empty".to_string());
        }

        if self.rpc_port == Some(0) {
            return Err("rpc_port must be > 0".to_string());
        }

        if self.rpc_user.is_some() != self.rpc_password.is_some() {
            return Err("rpc_user and rpc_password must be supplied together".to_string());
        }

        if self.http_timeout.is_zero() {
            return Err("http_timeout must be > 0".to_string());
        }

        if self.max_tx_file_size == 0 {
            return Err("max_tx_file_size must be > 0".to_string());
        }

        if !self.data_dir.is_dir() {
            return Err(format!("data directory {:?} does not exist", self.data_dir));
        }

        Ok(())
    }
}
