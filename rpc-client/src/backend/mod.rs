// SPDX-License-Identifier: CC0-1.0

//! Interchangeable HTTP transports for JSON-RPC payloads.
//!
//! Every backend takes a payload and returns the raw response body with its
//! HTTP status; interpreting the body is left to the client.

mod curl;
mod http_client;
mod raw;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

pub use self::curl::CurlBackend;
pub use self::http_client::{BlockingBackend, ReqwestBackend};
pub use self::raw::RawBackend;
use crate::auth::{Auth, AuthType};
use crate::error::{RpcError, RpcResult};

/// Transport selection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// [`BackendKind::Raw`] on Unix-like systems, [`BackendKind::Curl`] on
    /// Windows.
    #[default]
    Auto,
    /// Async `reqwest` client with a shared connection pool.
    Reqwest,
    /// Blocking `reqwest` client run on the blocking thread pool.
    Blocking,
    /// Hand-built HTTP/1.1 over a TCP stream.
    Raw,
    /// `curl` subprocess.
    Curl,
}

impl BackendKind {
    /// Resolves `Auto` for the current platform.
    pub fn resolve(self) -> BackendKind {
        match self {
            BackendKind::Auto if cfg!(windows) => BackendKind::Curl,
            BackendKind::Auto => BackendKind::Raw,
            other => other,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            BackendKind::Auto => "auto",
            BackendKind::Reqwest => "reqwest",
            BackendKind::Blocking => "blocking",
            BackendKind::Raw => "raw",
            BackendKind::Curl => "curl",
        };
        f.write_str(s)
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(BackendKind::Auto),
            "reqwest" | "aiohttp" => Ok(BackendKind::Reqwest),
            "blocking" | "requests" => Ok(BackendKind::Blocking),
            "raw" | "httplib" => Ok(BackendKind::Raw),
            "curl" => Ok(BackendKind::Curl),
            _ => Err(format!("'{}': unknown RPC backend", s)),
        }
    }
}

/// How a request path is derived from the per-call `wallet` argument.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HostPath {
    /// Always the base path.
    Fixed,
    /// `/wallet/<name>` when a wallet is given, `/` otherwise.
    Wallet,
    /// The argument itself, appended to the base path. Used for Monero's
    /// non-JSON-RPC methods, which live at `/<method>`.
    Method,
}

/// Where and how to reach a daemon. Shared by a client and its backend.
#[derive(Clone, Debug)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub https: bool,
    /// Prefix of every request path, e.g. `/json_rpc`.
    pub base_path: String,
    pub host_path: HostPath,
    pub timeout: Duration,
    pub auth: Option<Auth>,
    pub auth_type: Option<AuthType>,
    pub verify_server: bool,
    pub debug: bool,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            https: false,
            base_path: String::new(),
            host_path: HostPath::Fixed,
            timeout,
            auth: None,
            auth_type: None,
            verify_server: true,
            debug: false,
        }
    }

    /// `scheme://host:port` followed by the base path.
    pub fn url(&self) -> String {
        format!("{}{}", self.origin(), self.base_path)
    }

    fn origin(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Request path for a call made with the given `wallet` argument.
    pub fn request_path(&self, wallet: Option<&str>) -> String {
        let suffix = match (self.host_path, wallet) {
            (HostPath::Fixed, _) => String::new(),
            (HostPath::Wallet, Some(w)) => format!("/wallet/{}", w),
            (HostPath::Wallet, None) => "/".to_string(),
            (HostPath::Method, w) => w.unwrap_or_default().to_string(),
        };
        let path = format!("{}{}", self.base_path, suffix);
        if path.is_empty() { "/".to_string() } else { path }
    }

    /// Full request URL for a call.
    pub fn request_url(&self, wallet: Option<&str>) -> String {
        format!("{}{}", self.origin(), self.request_path(wallet))
    }

    /// Credentials to send when the scheme is `kind`.
    pub(crate) fn auth_for(&self, kind: AuthType) -> Option<&Auth> {
        (self.auth_type == Some(kind)).then_some(self.auth.as_ref()).flatten()
    }

    pub(crate) fn log_payload(&self, backend: BackendKind, body: &str) {
        if self.debug {
            tracing::debug!("RPC PAYLOAD data ({}) ==> {}", backend, body);
        }
    }
}

/// A transport bound to one endpoint.
#[derive(Debug)]
pub enum Backend {
    Reqwest(ReqwestBackend),
    Blocking(BlockingBackend),
    Raw(RawBackend),
    Curl(CurlBackend),
}

impl Backend {
    /// Creates the backend selected by `kind`.
    pub fn new(kind: BackendKind, endpoint: Arc<Endpoint>) -> RpcResult<Self> {
        Ok(match kind.resolve() {
            BackendKind::Reqwest => Backend::Reqwest(ReqwestBackend::new(endpoint)?),
            BackendKind::Blocking => Backend::Blocking(BlockingBackend::new(endpoint)),
            BackendKind::Raw => Backend::Raw(RawBackend::new(endpoint)),
            BackendKind::Curl => Backend::Curl(CurlBackend::new(endpoint)),
            BackendKind::Auto => unreachable!("resolved above"),
        })
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Reqwest(_) => BackendKind::Reqwest,
            Backend::Blocking(_) => BackendKind::Blocking,
            Backend::Raw(_) => BackendKind::Raw,
            Backend::Curl(_) => BackendKind::Curl,
        }
    }

    /// Posts `payload` and returns the response body and HTTP status.
    ///
    /// `timeout` overrides the endpoint default for this request. `wallet`
    /// selects the request path (see [`HostPath`]).
    pub async fn run(
        &self,
        payload: &Value,
        timeout: Option<Duration>,
        wallet: Option<&str>,
    ) -> RpcResult<(Vec<u8>, u16)> {
        let body = serde_json::to_string(payload)?;
        match self {
            Backend::Reqwest(b) => b.run(body, timeout, wallet).await,
            Backend::Blocking(b) => b.run(body, timeout, wallet).await,
            Backend::Raw(b) => b.run(body, timeout, wallet).await,
            Backend::Curl(b) => b.run(body, timeout, wallet).await,
        }
    }
}

pub(crate) fn timeout_error(e: impl fmt::Display) -> RpcError {
    tracing::debug!("RPC request timed out: {}", e);
    RpcError::Timeout
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind() {
        assert_eq!("httplib".parse::<BackendKind>().unwrap(), BackendKind::Raw);
        assert_eq!("Curl".parse::<BackendKind>().unwrap(), BackendKind::Curl);
        assert!("telnet".parse::<BackendKind>().is_err());
        assert_ne!(BackendKind::Auto.resolve(), BackendKind::Auto);
        assert_eq!(BackendKind::Blocking.resolve(), BackendKind::Blocking);
        assert_eq!(BackendKind::Reqwest.to_string(), "reqwest");
    }

    #[test]
    fn test_request_paths() {
        let mut ep = Endpoint::new("localhost", 8332, Duration::from_secs(1));
        assert_eq!(ep.url(), "http://localhost:8332");
        assert_eq!(ep.request_path(Some("w")), "/");

        ep.host_path = HostPath::Wallet;
        assert_eq!(ep.request_url(Some("cold")), "http://localhost:8332/wallet/cold");
        assert_eq!(ep.request_url(None), "http://localhost:8332/");

        let mut monero = Endpoint::new("node", 18081, Duration::from_secs(1));
        monero.https = true;
        monero.base_path = "/json_rpc".into();
        assert_eq!(monero.request_url(None), "https://node:18081/json_rpc");

        monero.base_path = "/".into();
        monero.host_path = HostPath::Method;
        assert_eq!(monero.request_url(Some("get_height")), "https://node:18081/get_height");
    }
}
