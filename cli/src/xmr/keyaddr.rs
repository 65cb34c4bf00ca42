// SPDX-License-Identifier: CC0-1.0

//! Unencrypted Monero key-address files.
//!
//! ```text
//! # comment lines and blank lines are ignored
//! 98831F3A XMR {
//!   1    4AdkPJoxn7JCvAby9szgnt93MSEwdnxdhaASxbTBm6x5dCwmsDep2UYN4FhStDn5i11nsJbpU7oj59ahg8gXb1Mg3viqCuk
//!        sec: 6ed6c2c0c0a6bb6b1d4e9e3e1c9d5b5e0b4a4f8d6c4b2e6d1f0c7a9b8e5d3c02
//!        viewkey: e8164dda6d42bd1e261a3406b3f5f4b2d8d0e5c3f2c1a6b9b6e2a1d4c7f8e903
//!        wallet_passwd: 5f1c2a9e7b3d8f4a6c0e1b2d3f4a5b6c
//! }
//! ```
//!
//! A testnet file names its network in the header: `98831F3A XMR:TESTNET {`.

use std::collections::BTreeMap;
use std::path::Path;

use coldwallet::Network;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyAddrError {
    #[error("line {line}: {reason}")]
    Syntax {
        line: usize,
        reason: String,
    },

    #[error("encrypted key-address files are not supported")]
    Encrypted,

    #[error("no addresses in key-address file")]
    Empty,

    #[error("address #{idx}: missing '{field}'")]
    MissingField {
        idx: u32,
        field: &'static str,
    },
}

/// One wallet's keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyAddrEntry {
    pub idx: u32,
    pub address: String,
    pub spendkey: String,
    pub viewkey: String,
    pub wallet_passwd: String,
}

/// A parsed key-address file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyAddrFile {
    /// Eight upper-case hex characters.
    pub seed_id: String,
    pub network: Network,
    entries: BTreeMap<u32, KeyAddrEntry>,
}

#[derive(Default)]
struct Partial {
    idx: u32,
    address: String,
    spendkey: Option<String>,
    viewkey: Option<String>,
    wallet_passwd: Option<String>,
}

impl Partial {
    fn finish(self) -> Result<KeyAddrEntry, KeyAddrError> {
        let idx = self.idx;
        let missing = move |field| KeyAddrError::MissingField {
            idx,
            field,
        };
        Ok(KeyAddrEntry {
            idx,
            address: self.address,
            spendkey: self.spendkey.ok_or_else(|| missing("sec"))?,
            viewkey: self.viewkey.ok_or_else(|| missing("viewkey"))?,
            wallet_passwd: self.wallet_passwd.ok_or_else(|| missing("wallet_passwd"))?,
        })
    }
}

fn is_seed_id(s: &str) -> bool {
    s.len() == 8 && s.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
}

fn is_hex_key(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

impl KeyAddrFile {
    pub fn read(path: &Path) -> Result<Self, KeyAddrError> {
        let bytes = std::fs::read(path).map_err(|e| KeyAddrError::Syntax {
            line: 0,
            reason: e.to_string(),
        })?;
        let data = String::from_utf8(bytes).map_err(|_| KeyAddrError::Encrypted)?;
        Self::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Self, KeyAddrError> {
        let mut lines = data
            .lines()
            .enumerate()
            .map(|(n, l)| (n + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

        let syntax = |line: usize, reason: &str| KeyAddrError::Syntax {
            line,
            reason: reason.to_string(),
        };

        let (hline, header) = lines.next().ok_or(KeyAddrError::Empty)?;
        let (seed_id, network) = match header.split_whitespace().collect::<Vec<_>>()[..] {
            [sid, coin, "{"] if is_seed_id(sid) => {
                let network = match coin.split_once(':') {
                    None if coin == "XMR" => Network::Mainnet,
                    Some(("XMR", "TESTNET")) => Network::Testnet,
                    _ => return Err(syntax(hline, "not a Monero key-address file")),
                };
                (sid.to_string(), network)
            }
            _ => return Err(syntax(hline, "invalid header")),
        };

        let mut entries = BTreeMap::new();
        let mut current: Option<Partial> = None;
        let mut closed = false;
        for (n, line) in lines {
            if closed {
                return Err(syntax(n, "data after closing brace"));
            }
            if line == "}" {
                closed = true;
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                let value = value.trim().to_string();
                let entry = current.as_mut().ok_or_else(|| syntax(n, "key data before first address"))?;
                let slot = match key {
                    "sec" if is_hex_key(&value) => &mut entry.spendkey,
                    "viewkey" if is_hex_key(&value) => &mut entry.viewkey,
                    "wallet_passwd" if !value.is_empty() => &mut entry.wallet_passwd,
                    "sec" | "viewkey" | "wallet_passwd" => return Err(syntax(n, "invalid value")),
                    _ => return Err(syntax(n, "unknown field")),
                };
                if slot.replace(value).is_some() {
                    return Err(syntax(n, "duplicate field"));
                }
                continue;
            }
            let (idx, address) = match line.split_whitespace().collect::<Vec<_>>()[..] {
                [idx, address] => (idx, address),
                _ => return Err(syntax(n, "expected index and address")),
            };
            let idx: u32 = idx.parse().ok().filter(|i| *i > 0).ok_or_else(|| syntax(n, "invalid address index"))?;
            if let Some(prev) = current.take() {
                let prev = prev.finish()?;
                entries.insert(prev.idx, prev);
            }
            if entries.contains_key(&idx) {
                return Err(syntax(n, "duplicate address index"));
            }
            current = Some(Partial {
                idx,
                address: address.to_string(),
                ..Default::default()
            });
        }
        if !closed {
            return Err(syntax(data.lines().count(), "missing closing brace"));
        }
        if let Some(last) = current.take() {
            let last = last.finish()?;
            entries.insert(last.idx, last);
        }
        if entries.is_empty() {
            return Err(KeyAddrError::Empty);
        }
        Ok(Self {
            seed_id,
            network,
            entries,
        })
    }

    pub fn entry(&self, idx: u32) -> Option<&KeyAddrEntry> {
        self.entries.get(&idx)
    }

    pub fn entries(&self) -> impl Iterator<Item = &KeyAddrEntry> {
        self.entries.values()
    }

    pub fn indexes(&self) -> Vec<u32> {
        self.entries.keys().copied().collect()
    }

    /// Wallet file name for address `idx`.
    pub fn wallet_filename(&self, idx: u32) -> String {
        let suffix = if self.network == Network::Testnet { "-testnet" } else { "" };
        format!("{}-{}-MoneroWallet{}", self.seed_id, idx, suffix)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SEC: &str = "6ed6c2c0c0a6bb6b1d4e9e3e1c9d5b5e0b4a4f8d6c4b2e6d1f0c7a9b8e5d3c02";
    const VIEW: &str = "e8164dda6d42bd1e261a3406b3f5f4b2d8d0e5c3f2c1a6b9b6e2a1d4c7f8e903";

    fn file(header: &str, body: &str) -> String {
        format!("# Monero key-address file\n\n{}\n{}\n}}\n", header, body)
    }

    fn entry(idx: u32, addr: &str) -> String {
        format!("  {} {}\n    sec: {}\n    viewkey: {}\n    wallet_passwd: pw{}\n", idx, addr, SEC, VIEW, idx)
    }

    #[test]
    fn test_parse() {
        let data = file("98831F3A XMR {", &format!("{}{}", entry(1, "4Aaa"), entry(3, "4Bbb")));
        let kaf = KeyAddrFile::parse(&data).unwrap();
        assert_eq!(kaf.seed_id, "98831F3A");
        assert_eq!(kaf.network, Network::Mainnet);
        assert_eq!(kaf.indexes(), vec![1, 3]);
        let e = kaf.entry(3).unwrap();
        assert_eq!(e.address, "4Bbb");
        assert_eq!(e.spendkey, SEC);
        assert_eq!(e.wallet_passwd, "pw3");
        assert!(kaf.entry(2).is_none());
        assert_eq!(kaf.wallet_filename(3), "98831F3A-3-MoneroWallet");
    }

    #[test]
    fn test_testnet_header() {
        let data = file("98831F3A XMR:TESTNET {", &entry(1, "9zz"));
        let kaf = KeyAddrFile::parse(&data).unwrap();
        assert_eq!(kaf.network, Network::Testnet);
        assert_eq!(kaf.wallet_filename(1), "98831F3A-1-MoneroWallet-testnet");
    }

    #[test]
    fn test_rejects() {
        let bad_header = file("98831F3A BTC {", &entry(1, "4Aaa"));
        assert_matches!(KeyAddrFile::parse(&bad_header), Err(KeyAddrError::Syntax { line: 3, .. }));

        let lower_sid = file("98831f3a XMR {", &entry(1, "4Aaa"));
        assert_matches!(KeyAddrFile::parse(&lower_sid), Err(KeyAddrError::Syntax { .. }));

        let short_key = file("98831F3A XMR {", "  1 4Aaa\n    sec: 6ed6c2");
        assert_matches!(KeyAddrFile::parse(&short_key), Err(KeyAddrError::Syntax { line: 5, reason }) if reason == "invalid value");

        let no_passwd = file("98831F3A XMR {", &format!("  1 4Aaa\n    sec: {}\n    viewkey: {}\n", SEC, VIEW));
        assert_matches!(
            KeyAddrFile::parse(&no_passwd),
            Err(KeyAddrError::MissingField { idx: 1, field: "wallet_passwd" })
        );

        let dup = file("98831F3A XMR {", &format!("{}{}", entry(1, "4Aaa"), entry(1, "4Bbb")));
        assert_matches!(KeyAddrFile::parse(&dup), Err(KeyAddrError::Syntax { reason, .. }) if reason.contains("duplicate"));

        let unclosed = "98831F3A XMR {\n".to_string() + &entry(1, "4Aaa");
        assert_matches!(KeyAddrFile::parse(&unclosed), Err(KeyAddrError::Syntax { reason, .. }) if reason.contains("closing"));

        assert_matches!(KeyAddrFile::parse("# nothing\n"), Err(KeyAddrError::Empty));
    }

    #[test]
    fn test_encrypted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.akeys.mmenc");
        std::fs::write(&path, [0xffu8, 0xfe, 0x00, 0x81, 0x9c]).unwrap();
        assert_matches!(KeyAddrFile::read(&path), Err(KeyAddrError::Encrypted));
    }
}
