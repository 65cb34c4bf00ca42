// SPDX-License-Identifier: CC0-1.0

//! RPC credentials: discovery and HTTP authorization headers.
//!
//! Credentials are taken, in order of preference, from the configuration,
//! from `rpcuser`/`rpcpassword` in the daemon's config file, and from the
//! daemon's `.cookie` file. Basic and digest (RFC 2617, MD5, `qop=auth`)
//! schemes are supported.

use std::fs;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use coldwallet_network::Protocol;
use md5::{Digest, Md5};

use crate::config::Config;
use crate::error::{RpcError, RpcResult};

/// HTTP authentication scheme expected by a daemon.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AuthType {
    Basic,
    Digest,
}

/// User name and password for a daemon.
#[derive(Clone, PartialEq, Eq)]
pub struct Auth {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Auth").field("user", &self.user).field("password", &"<redacted>").finish()
    }
}

impl Auth {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Value of an `Authorization` header for basic auth.
    pub fn basic_header(&self) -> String {
        let raw = format!("{}:{}", self.user, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

/// Finds credentials for a Bitcoin-family daemon.
pub fn resolve_credentials(config: &Config) -> RpcResult<Auth> {
    if let (Some(user), Some(password)) = (&config.rpc_user, &config.rpc_password)
        && !user.is_empty()
        && !password.is_empty()
    {
        return Ok(Auth::new(user.as_str(), password.as_str()));
    }

    if let Some(datadir) = config.daemon_data_dir() {
        let cfg_file = datadir.join(config.protocol.cfg_file());
        let opts = read_daemon_cfg_options(&cfg_file, &["rpcuser", "rpcpassword"]);
        if let [Some(user), Some(password)] = opts.as_slice()
            && !user.is_empty()
            && !password.is_empty()
        {
            tracing::debug!("Using RPC credentials from {}", cfg_file.display());
            return Ok(Auth::new(user.as_str(), password.as_str()));
        }

        let cookie_file = datadir.join(config.protocol.data_subdir()).join(".cookie");
        if let Some((user, password)) = read_auth_cookie(&cookie_file).as_deref().and_then(|c| c.split_once(':')) {
            tracing::debug!("Using RPC auth cookie {}", cookie_file.display());
            return Ok(Auth::new(user, password));
        }
    }

    Err(RpcError::Credentials(credentials_help(&config.protocol)))
}

/// Reads `key=value` settings from a daemon config file.
///
/// Returns one entry per requested key, `None` where the key is absent or
/// its value contains a space. A missing or unreadable file yields all
/// `None`. Later lines override earlier ones.
pub fn read_daemon_cfg_options(path: &Path, keys: &[&str]) -> Vec<Option<String>> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!("Daemon config file {} unreadable: {}", path.display(), e);
            return vec![None; keys.len()];
        }
    };
    keys.iter()
        .map(|key| {
            data.lines()
                .filter(|line| line.starts_with(key))
                .filter_map(|line| line.split_once('='))
                .map(|(_, value)| value.trim())
                .filter(|value| !value.contains(' '))
                .last()
                .map(str::to_string)
        })
        .collect()
}

/// First line of the daemon's auth cookie file, if readable.
pub fn read_auth_cookie(path: &Path) -> Option<String> {
    let data = fs::read_to_string(path).ok()?;
    data.lines().next().map(str::to_string)
}

fn credentials_help(proto: &Protocol) -> String {
    let cf_name = proto.cfg_file();
    format!(
        "Error: no {} RPC authentication method found

RPC credentials must be supplied using one of the following methods:

A) If daemon is local and running as same user as you:

   - no credentials required, or matching rpcuser/rpcpassword in {cf_name}
     and the wallet's --rpc-user/--rpc-password options

B) If daemon is running remotely or as different user:

   - matching credentials in {cf_name} and on the command line as above

For better security, rpcauth should be used in {cf_name} instead of
rpcuser/rpcpassword.",
        proto.cls_name()
    )
}

/// A parsed `WWW-Authenticate: Digest ...` challenge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// `Some("auth")` when the server offers `qop=auth`.
    pub qop: Option<String>,
    pub algorithm: Option<String>,
}

impl DigestChallenge {
    /// Parses a challenge header value. Returns `None` for other schemes or
    /// when realm or nonce are missing.
    pub fn parse(header: &str) -> Option<Self> {
        let (scheme, rest) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }
        let params = split_params(rest);
        let get = |name: &str| {
            params.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.clone())
        };
        let qop = get("qop").and_then(|q| q.split(',').map(str::trim).find(|q| *q == "auth").map(str::to_string));
        Some(Self {
            realm: get("realm")?,
            nonce: get("nonce")?,
            opaque: get("opaque"),
            qop,
            algorithm: get("algorithm"),
        })
    }

    /// The `Authorization` header value answering this challenge.
    pub fn response_header(&self, auth: &Auth, method: &str, uri: &str, nc: u32, cnonce: &str) -> String {
        let ha1 = md5_hex(&format!("{}:{}:{}", auth.user, self.realm, auth.password));
        let ha2 = md5_hex(&format!("{}:{}", method, uri));
        let nc = format!("{:08x}", nc);
        let response = match &self.qop {
            Some(qop) => md5_hex(&format!("{}:{}:{}:{}:{}:{}", ha1, self.nonce, nc, cnonce, qop, ha2)),
            None => md5_hex(&format!("{}:{}:{}", ha1, self.nonce, ha2)),
        };

        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", response="{}""#,
            auth.user, self.realm, self.nonce, uri, response
        );
        if let Some(algorithm) = &self.algorithm {
            header.push_str(&format!(", algorithm={}", algorithm));
        }
        if let Some(qop) = &self.qop {
            header.push_str(&format!(r#", qop={}, nc={}, cnonce="{}""#, qop, nc, cnonce));
        }
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{}""#, opaque));
        }
        header
    }
}

/// Random client nonce for digest auth.
pub fn make_cnonce() -> String {
    hex::encode(rand::random::<[u8; 8]>())
}

fn md5_hex(s: &str) -> String {
    hex::encode(Md5::digest(s.as_bytes()))
}

/// Splits `k1="v, 1", k2=v2` into pairs, honouring quotes.
fn split_params(s: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut chars = s.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| *c == ',' || c.is_whitespace()) {
            chars.next();
        }
        let key: String = chars.by_ref().take_while(|c| *c != '=').collect::<String>().trim().to_string();
        if key.is_empty() {
            return out;
        }
        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '"' => break,
                    '\\' => value.extend(chars.next()),
                    c => value.push(c),
                }
            }
        } else {
            while let Some(c) = chars.peek().copied() {
                if c == ',' {
                    break;
                }
                value.push(c);
                chars.next();
            }
        }
        out.push((key, value.trim().to_string()));
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use coldwallet::{Coin, Network};

    use super::*;

    #[test]
    fn test_basic_header() {
        assert_eq!(Auth::new("Aladdin", "open sesame").basic_header(), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    }

    #[test]
    fn test_digest_rfc2617_example() {
        let challenge = DigestChallenge::parse(
            r#"Digest realm="testrealm@host.com", qop="auth,auth-int", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#,
        )
        .unwrap();
        assert_eq!(challenge.realm, "testrealm@host.com");
        assert_eq!(challenge.qop.as_deref(), Some("auth"));

        let auth = Auth::new("Mufasa", "Circle Of Life");
        let header = challenge.response_header(&auth, "GET", "/dir/index.html", 1, "0a4f113b");
        assert!(header.contains(r#"response="6629fae49393a05397450978507c4ef1""#));
        assert!(header.contains("nc=00000001"));
        assert!(header.contains(r#"opaque="5ccc069c403ebaf9f0171e9517f40e41""#));
    }

    #[test]
    fn test_digest_parse_rejects() {
        assert_eq!(DigestChallenge::parse(r#"Basic realm="x""#), None);
        assert_eq!(DigestChallenge::parse(r#"Digest realm="x""#), None);
        let monero = DigestChallenge::parse(r#"Digest qop="auth",algorithm=MD5,realm="monero-rpc",nonce="abc==",stale=false"#)
            .unwrap();
        assert_eq!(monero.algorithm.as_deref(), Some("MD5"));
        assert_eq!(monero.nonce, "abc==");
    }

    #[test]
    fn test_read_daemon_cfg_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bitcoin.conf");
        fs::write(&path, "server=1\nrpcuser=first\nrpcuser = alice\nrpcpassword=two words\n").unwrap();
        let opts = read_daemon_cfg_options(&path, &["rpcuser", "rpcpassword"]);
        assert_eq!(opts, vec![Some("alice".to_string()), None]);

        let missing = read_daemon_cfg_options(&dir.path().join("none.conf"), &["rpcuser"]);
        assert_eq!(missing, vec![None]);
    }

    #[test]
    fn test_resolve_credentials_order() {
        let dir = tempfile::tempdir().unwrap();
        let proto = Protocol::new(Coin::Btc, Network::Regtest);
        let config = Config::new(proto).with_daemon_data_dir(dir.path());

        assert_matches!(resolve_credentials(&config), Err(RpcError::Credentials(msg)) if msg.contains("bitcoin.conf"));

        fs::create_dir(dir.path().join("regtest")).unwrap();
        fs::write(dir.path().join("regtest/.cookie"), "__cookie__:deadbeef\n").unwrap();
        assert_eq!(resolve_credentials(&config).unwrap(), Auth::new("__cookie__", "deadbeef"));

        fs::write(dir.path().join("bitcoin.conf"), "rpcuser=bob\nrpcpassword=hunter2\n").unwrap();
        assert_eq!(resolve_credentials(&config).unwrap(), Auth::new("bob", "hunter2"));

        let explicit = config.clone().with_rpc_credentials("carol", "pw");
        assert_eq!(resolve_credentials(&explicit).unwrap(), Auth::new("carol", "pw"));

        // empty explicit credentials fall through
        let empty = config.with_rpc_credentials("", "");
        assert_eq!(resolve_credentials(&empty).unwrap(), Auth::new("bob", "hunter2"));
    }
}
