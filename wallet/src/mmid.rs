// SPDX-License-Identifier: CC0-1.0

//! Wallet key identifiers of the form `SEEDID:TYPE:INDEX`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Address type letter of a wallet key id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyType {
    /// Legacy, uncompressed public key.
    Legacy,
    /// Legacy, compressed public key.
    Compressed,
    /// Segwit nested in P2SH.
    Segwit,
    /// Native segwit.
    Bech32,
}

impl KeyType {
    pub fn letter(self) -> char {
        match self {
            KeyType::Legacy => 'L',
            KeyType::Compressed => 'C',
            KeyType::Segwit => 'S',
            KeyType::Bech32 => 'B',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'L' => Some(KeyType::Legacy),
            'C' => Some(KeyType::Compressed),
            'S' => Some(KeyType::Segwit),
            'B' => Some(KeyType::Bech32),
            _ => None,
        }
    }

    /// Whether inputs of this type spend through a witness.
    pub fn is_segwit(self) -> bool {
        matches!(self, KeyType::Segwit | KeyType::Bech32)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid wallet key id '{0}'")]
pub struct KeyIdError(pub String);

/// Identifies a key in the wallet's deterministic key space.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WalletKeyId {
    seed_id: String,
    key_type: KeyType,
    index: u32,
}

impl WalletKeyId {
    pub fn new(seed_id: &str, key_type: KeyType, index: u32) -> Result<Self, KeyIdError> {
        let valid = seed_id.len() == 8
            && seed_id.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b));
        if !valid || index == 0 {
            return Err(KeyIdError(format!("{}:{}:{}", seed_id, key_type.letter(), index)));
        }
        Ok(Self {
            seed_id: seed_id.to_string(),
            key_type,
            index,
        })
    }

    pub fn seed_id(&self) -> &str {
        &self.seed_id
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for WalletKeyId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.seed_id, self.key_type.letter(), self.index)
    }
}

impl FromStr for WalletKeyId {
    type Err = KeyIdError;

    /// Accepts `SEEDID:TYPE:INDEX`, and the short `SEEDID:INDEX` meaning type `L`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || KeyIdError(s.to_string());
        let parts: Vec<&str> = s.split(':').collect();
        let (seed_id, key_type, index) = match parts.as_slice() {
            [sid, t, idx] => {
                let mut chars = t.chars();
                let key_type = match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyType::from_letter(c).ok_or_else(err)?,
                    _ => return Err(err()),
                };
                (*sid, key_type, *idx)
            }
            [sid, idx] => (*sid, KeyType::Legacy, *idx),
            _ => return Err(err()),
        };
        if !index.bytes().all(|b| b.is_ascii_digit()) || index.starts_with('0') {
            return Err(err());
        }
        let index: u32 = index.parse().map_err(|_| err())?;
        WalletKeyId::new(seed_id, key_type, index).map_err(|_| err())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let id: WalletKeyId = "F00BAA12:S:7".parse().unwrap();
        assert_eq!(id.seed_id(), "F00BAA12");
        assert_eq!(id.key_type(), KeyType::Segwit);
        assert_eq!(id.index(), 7);
        assert_eq!(id.to_string(), "F00BAA12:S:7");

        let short: WalletKeyId = "F00BAA12:3".parse().unwrap();
        assert_eq!(short.key_type(), KeyType::Legacy);
        assert_eq!(short.to_string(), "F00BAA12:L:3");
    }

    #[test]
    fn test_parse_rejects() {
        for bad in [
            "f00baa12:C:1",
            "F00BAA1:C:1",
            "F00BAA12:X:1",
            "F00BAA12:C:0",
            "F00BAA12:C:01",
            "F00BAA12:CC:1",
            "F00BAA12:C:-1",
            "F00BAA12",
            "F00BAA12:C:1:2",
        ] {
            assert!(bad.parse::<WalletKeyId>().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_ordering() {
        let a: WalletKeyId = "F00BAA12:C:2".parse().unwrap();
        let b: WalletKeyId = "F00BAA12:C:10".parse().unwrap();
        assert!(a < b);
    }
}
