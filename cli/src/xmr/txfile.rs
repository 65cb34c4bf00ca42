// SPDX-License-Identifier: CC0-1.0

//! Files holding signed Monero transactions created without relaying.
//!
//! The file is a JSON object: the transaction data and a 6-character
//! checksum of its compact serialization.

use std::path::{Path, PathBuf};

use coldwallet::checksum::make_chksum_6;
use coldwallet::txfile::atomic_write;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoneroTxFileError {
    #[error("checksum mismatch: file says {stored}, data hashes to {computed}")]
    Checksum {
        stored: String,
        computed: String,
    },

    #[error("malformed transaction file: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A created but unrelayed transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneroTxData {
    /// `transfer` or `sweep`.
    pub op: String,
    pub network: String,
    pub seed_id: String,
    /// `SOURCE:ACCOUNT` the funds come from.
    pub source: String,
    pub dest_address: String,
    pub txid: String,
    /// Amount and fee in XMR.
    pub amount: String,
    pub fee: String,
    /// Signed transaction hex.
    pub blob: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "MoneroTx")]
    data: MoneroTxData,
    checksum: String,
}

fn checksum(data: &MoneroTxData) -> Result<String, MoneroTxFileError> {
    Ok(make_chksum_6(serde_json::to_string(data)?.as_bytes()))
}

impl MoneroTxData {
    pub fn to_file_string(&self) -> Result<String, MoneroTxFileError> {
        let envelope = Envelope {
            data: self.clone(),
            checksum: checksum(self)?,
        };
        Ok(serde_json::to_string_pretty(&envelope)? + "\n")
    }

    /// Parses a file and verifies its checksum.
    pub fn from_file_str(s: &str) -> Result<Self, MoneroTxFileError> {
        let envelope: Envelope = serde_json::from_str(s)?;
        let computed = checksum(&envelope.data)?;
        if computed != envelope.checksum {
            return Err(MoneroTxFileError::Checksum {
                stored: envelope.checksum,
                computed,
            });
        }
        Ok(envelope.data)
    }

    /// `TXID6-XMR[AMOUNT][.NETWORK].sigtx`
    pub fn filename(&self) -> String {
        let txid6: String = self.txid.chars().take(6).collect::<String>().to_uppercase();
        let network = if self.network == "mainnet" { String::new() } else { format!(".{}", self.network) };
        format!("{}-XMR[{}]{}.sigtx", txid6, self.amount, network)
    }

    pub fn write(&self, dir: &Path) -> Result<PathBuf, MoneroTxFileError> {
        let path = dir.join(self.filename());
        atomic_write(&path, self.to_file_string()?.as_bytes())?;
        Ok(path)
    }

    pub fn read(path: &Path) -> Result<Self, MoneroTxFileError> {
        Self::from_file_str(&std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn sample() -> MoneroTxData {
        MoneroTxData {
            op: "sweep".into(),
            network: "mainnet".into(),
            seed_id: "98831F3A".into(),
            source: "2:0".into(),
            dest_address: "4AdkPJoxn7JCvAby9szgnt93MSEwdnxdhaASxbTBm6x5dCwmsDep2UYN4FhStDn5i11nsJbpU7oj59ahg8gXb1Mg3viqCuk"
                .into(),
            txid: "c1b2a3f4e5d6c7b8a9f0e1d2c3b4a5f6e7d8c9b0a1f2e3d4c5b6a7f8e9d0c1b2".into(),
            amount: "1.25".into(),
            fee: "0.00003".into(),
            blob: "0200010200".into(),
            timestamp: "20240301_093000".into(),
        }
    }

    #[test]
    fn test_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let tx = sample();
        let path = tx.write(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "C1B2A3-XMR[1.25].sigtx");
        assert_eq!(MoneroTxData::read(&path).unwrap(), tx);
    }

    #[test]
    fn test_tampered_file() {
        let s = sample().to_file_string().unwrap();
        let tampered = s.replace("1.25", "12.5");
        assert_matches!(MoneroTxData::from_file_str(&tampered), Err(MoneroTxFileError::Checksum { .. }));
        assert_matches!(MoneroTxData::from_file_str("{}"), Err(MoneroTxFileError::Json(_)));
    }

    #[test]
    fn test_testnet_filename() {
        let tx = MoneroTxData {
            network: "testnet".into(),
            ..sample()
        };
        assert_eq!(tx.filename(), "C1B2A3-XMR[1.25].testnet.sigtx");
    }
}
