// SPDX-License-Identifier: CC0-1.0

//! Size estimation and fee policy.
//!
//! Fee problems are reported as [`FeeCheck`] values rather than errors, since
//! the caller usually wants to ask the user for another fee.

use std::fmt;

use super::Tx;
use crate::amount::Amount;
use crate::error::{AmountError, TxError, TxResult};
use crate::mmid::KeyType;
use crate::script::parse_address;

const SIG_SIZE: usize = 72;
const PUBKEY_COMPRESSED: usize = 33;
const PUBKEY_UNCOMPRESSED: usize = 65;
const OUTPOINT_SIZE: usize = 36;

// txid vout [scriptSig len] scriptSig nSeq
const SEGWIT_INPUT_SIZE: usize = OUTPOINT_SIZE + 1 + 23 + 4;
const LEGACY_INPUT_SIZE: usize = OUTPOINT_SIZE + 1 + 2 + SIG_SIZE + PUBKEY_UNCOMPRESSED + 4;
const COMPRESSED_INPUT_SIZE: usize = OUTPOINT_SIZE + 1 + 2 + SIG_SIZE + PUBKEY_COMPRESSED + 4;
// count, sig len, sig, pubkey len, pubkey
const SEGWIT_WITNESS_SIZE: usize = 1 + 1 + SIG_SIZE + 1 + PUBKEY_COMPRESSED;

/// A user-supplied fee: an absolute amount or a rate in minimal units per
/// byte (`25s`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FeeSpec {
    Absolute(Amount),
    PerByte(u64),
}

impl FeeSpec {
    /// An amount is tried first, then the `<N>s` form with `N >= 1`.
    pub fn parse(s: &str, decimals: u32) -> Result<Self, AmountError> {
        if let Ok(amount) = Amount::from_str_in(s, decimals) {
            return Ok(FeeSpec::Absolute(amount));
        }
        match s.strip_suffix('s') {
            Some(n) if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => {
                match n.parse::<u64>() {
                    Ok(spb) if spb >= 1 => Ok(FeeSpec::PerByte(spb)),
                    _ => Err(AmountError::Invalid(s.to_string())),
                }
            }
            _ => Err(AmountError::Invalid(s.to_string())),
        }
    }

    /// Resolves the spec to an absolute fee for a transaction of `vsize`.
    pub fn to_amount(self, vsize: usize) -> Result<Amount, AmountError> {
        match self {
            FeeSpec::Absolute(amount) => Ok(amount),
            FeeSpec::PerByte(spb) => spb_to_fee(spb, vsize),
        }
    }
}

/// Outcome of checking a proposed fee.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeeCheck {
    Ok(Amount),
    /// Above the protocol ceiling, or for a bump not below the output it is
    /// taken from.
    TooLarge {
        fee: Amount,
        max: Amount,
    },
    /// Below the relay fee, or for a bump below the minimum replacement fee.
    TooSmall {
        fee: Amount,
        min: Amount,
    },
    Invalid(String),
    /// Transaction size cannot be estimated, so a rate cannot be applied.
    SizeUnknown,
}

impl FeeCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, FeeCheck::Ok(_))
    }

    pub fn amount(&self) -> Option<Amount> {
        match self {
            FeeCheck::Ok(a) => Some(*a),
            _ => None,
        }
    }
}

impl fmt::Display for FeeCheck {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FeeCheck::Ok(fee) => write!(f, "fee {} accepted", fee),
            FeeCheck::TooLarge { fee, max } => write!(f, "fee {} too large, maximum {}", fee, max),
            FeeCheck::TooSmall { fee, min } => write!(f, "fee {} too small, minimum {}", fee, min),
            FeeCheck::Invalid(s) => write!(f, "'{}': invalid fee", s),
            FeeCheck::SizeUnknown => f.write_str("transaction size unknown"),
        }
    }
}

/// Rate in minimal units per byte, truncated.
pub fn fee_to_spb(fee: Amount, vsize: usize) -> u64 {
    if vsize == 0 {
        return 0;
    }
    fee.to_sat() / vsize as u64
}

pub fn spb_to_fee(spb: u64, vsize: usize) -> Result<Amount, AmountError> {
    Amount::from_sat(spb).checked_mul(vsize as u64)
}

/// Checks `fee` against the protocol maximum and the daemon's relay fee.
///
/// The relay comparison is exact: `fee * 1024 < relay_fee_per_kb * vsize`
/// means too small.
pub fn check_fee(fee: Amount, vsize: usize, relay_fee_per_kb: Amount, max: Option<Amount>) -> FeeCheck {
    if let Some(max) = max {
        if fee > max {
            return FeeCheck::TooLarge { fee, max };
        }
    }
    let lhs = u128::from(fee.to_sat()) * 1024;
    let rhs = u128::from(relay_fee_per_kb.to_sat()) * vsize as u128;
    if lhs < rhs {
        return FeeCheck::TooSmall {
            fee,
            min: relay_fee(relay_fee_per_kb, vsize),
        };
    }
    FeeCheck::Ok(fee)
}

/// Relay fee for `vsize` bytes, rounded up to a whole minimal unit.
pub fn relay_fee(relay_fee_per_kb: Amount, vsize: usize) -> Amount {
    let total = u128::from(relay_fee_per_kb.to_sat()) * vsize as u128;
    Amount::from_sat(u64::try_from(total.div_ceil(1024)).unwrap_or(u64::MAX))
}

impl Tx {
    /// Estimated virtual size in bytes, or `None` when the transaction is
    /// incomplete or an output address cannot be parsed.
    ///
    /// Counts are assumed to take one byte. Wallet inputs that are not
    /// segwit are sized as uncompressed; other inputs as compressed.
    pub fn estimate_vsize(&self) -> Option<usize> {
        if self.inputs.is_empty() || self.outputs.is_empty() {
            return None;
        }
        let is_segwit = |i: &super::TxInput| i.mmid.as_ref().is_some_and(|m| m.key_type() == KeyType::Segwit);

        let isize: usize = self
            .inputs
            .iter()
            .map(|i| match &i.mmid {
                Some(_) if is_segwit(i) => SEGWIT_INPUT_SIZE,
                Some(_) => LEGACY_INPUT_SIZE,
                None => COMPRESSED_INPUT_SIZE,
            })
            .sum();

        let mut osize = 0;
        for o in &self.outputs {
            osize += parse_address(&o.addr, &self.proto).ok()?.0.output_size();
        }

        let wsize: usize = if self.has_segwit_inputs() {
            self.inputs.iter().map(|i| if is_segwit(i) { SEGWIT_WITNESS_SIZE } else { 1 }).sum()
        } else {
            0
        };

        let old_size = 4 + 1 + isize + 1 + osize + 4;
        let new_size = if wsize > 0 { old_size + 2 + wsize } else { old_size };
        Some((old_size * 3 + new_size).div_ceil(4))
    }

    /// Relay fee for this transaction at the daemon's per-kB rate.
    pub fn relay_fee(&self, relay_fee_per_kb: Amount) -> Option<Amount> {
        self.estimate_vsize().map(|size| relay_fee(relay_fee_per_kb, size))
    }

    pub fn fee_to_spb(&self, fee: Amount) -> Option<u64> {
        self.estimate_vsize().map(|size| fee_to_spb(fee, size))
    }

    /// Resolves a user fee string and checks it against policy.
    pub fn get_usr_fee(&self, spec: &str, relay_fee_per_kb: Amount) -> FeeCheck {
        let Some(size) = self.estimate_vsize() else {
            return FeeCheck::SizeUnknown;
        };
        let fee = match FeeSpec::parse(spec, self.decimals()).and_then(|s| s.to_amount(size)) {
            Ok(fee) => fee,
            Err(_) => return FeeCheck::Invalid(spec.to_string()),
        };
        check_fee(fee, size, relay_fee_per_kb, self.proto.max_tx_fee().map(Amount::from_sat))
    }

    /// Smallest fee a replacement may pay: the current fee plus the relay fee.
    pub fn min_bump_fee(&self, relay_fee_per_kb: Amount) -> TxResult<Amount> {
        let relay = self.relay_fee(relay_fee_per_kb).ok_or(TxError::Empty("outputs"))?;
        Ok(self.fee()?.checked_add(relay)?)
    }

    /// Checks a replacement fee to be deducted from output `idx`.
    pub fn check_bump_fee(&self, spec: &str, idx: usize, relay_fee_per_kb: Amount) -> TxResult<FeeCheck> {
        let output_amount = self.outputs.get(idx).ok_or(TxError::OutputIndex(idx))?.amount;
        let check = self.get_usr_fee(spec, relay_fee_per_kb);
        let FeeCheck::Ok(fee) = check else {
            return Ok(check);
        };
        let min = self.min_bump_fee(relay_fee_per_kb)?;
        if fee < min {
            return Ok(FeeCheck::TooSmall { fee, min });
        }
        if fee >= output_amount {
            return Ok(FeeCheck::TooLarge {
                fee,
                max: output_amount,
            });
        }
        Ok(FeeCheck::Ok(fee))
    }
}
