// SPDX-License-Identifier: CC0-1.0

//! Wallet lists and transfer/sweep specifiers.

use std::collections::BTreeSet;
use std::str::FromStr;

use coldwallet::Amount;
use thiserror::Error;

/// Atomic units per XMR, as a power of ten.
pub const XMR_DECIMALS: u32 = 12;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("'{0}': invalid wallet list")]
    WalletList(String),

    #[error("'{spec}': invalid {kind} specifier ({format})")]
    Specifier {
        spec: String,
        kind: &'static str,
        format: &'static str,
    },

    #[error("'{0}': invalid Monero address")]
    Address(String),

    #[error("'{0}': invalid XMR amount")]
    Amount(String),
}

fn wallet_number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok().filter(|n| *n > 0)
}

/// Parses `1,3,5-7` into a sorted list of distinct wallet numbers.
pub fn parse_wallet_list(s: &str) -> Result<Vec<u32>, SpecError> {
    let bad = || SpecError::WalletList(s.to_string());
    let mut out = BTreeSet::new();
    for part in s.split(',') {
        match part.split_once('-') {
            Some((lo, hi)) => {
                let (lo, hi) = (wallet_number(lo).ok_or_else(bad)?, wallet_number(hi).ok_or_else(bad)?);
                if lo > hi {
                    return Err(bad());
                }
                out.extend(lo..=hi);
            }
            None => {
                out.insert(wallet_number(part).ok_or_else(bad)?);
            }
        }
    }
    Ok(out.into_iter().collect())
}

/// Standard and integrated address lengths.
fn check_address(addr: &str) -> Result<(), SpecError> {
    if matches!(addr.len(), 95 | 106) && addr.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(SpecError::Address(addr.to_string()))
    }
}

/// `SOURCE:ACCOUNT:ADDRESS,AMOUNT`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferSpec {
    pub source: u32,
    pub account: u32,
    pub address: String,
    pub amount: Amount,
}

impl FromStr for TransferSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || SpecError::Specifier {
            spec: s.to_string(),
            kind: "transfer",
            format: "SOURCE:ACCOUNT:ADDRESS,AMOUNT",
        };
        let (head, amount) = s.rsplit_once(',').ok_or_else(bad)?;
        let [source, account, address] = head.split(':').collect::<Vec<_>>()[..] else {
            return Err(bad());
        };
        check_address(address)?;
        let amount = Amount::from_str_in(amount, XMR_DECIMALS)
            .ok()
            .filter(|a| *a > Amount::ZERO)
            .ok_or_else(|| SpecError::Amount(amount.to_string()))?;
        Ok(Self {
            source: wallet_number(source).ok_or_else(bad)?,
            account: account.parse().map_err(|_| bad())?,
            address: address.to_string(),
            amount,
        })
    }
}

/// `SOURCE:ACCOUNT[,DEST]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SweepSpec {
    pub source: u32,
    pub account: u32,
    /// Wallet receiving the funds in a new account; `None` sweeps to a new
    /// address in the source account.
    pub dest: Option<u32>,
}

impl FromStr for SweepSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || SpecError::Specifier {
            spec: s.to_string(),
            kind: "sweep",
            format: "SOURCE:ACCOUNT[,DEST]",
        };
        let (head, dest) = match s.split_once(',') {
            Some((head, dest)) => (head, Some(wallet_number(dest).ok_or_else(bad)?)),
            None => (s, None),
        };
        let (source, account) = head.split_once(':').ok_or_else(bad)?;
        Ok(Self {
            source: wallet_number(source).ok_or_else(bad)?,
            account: account.parse().map_err(|_| bad())?,
            dest,
        })
    }
}
