// SPDX-License-Identifier: CC0-1.0

//! Exact coin amounts.
//!
//! Amounts are held as a count of the coin's smallest unit and only turned
//! into decimal strings at the edges (files, RPC payloads, display). No
//! floating point is involved anywhere.

use std::fmt;
use std::iter::Sum;

use crate::error::AmountError;

/// An amount in minimal coin units.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    /// Zero.
    pub const ZERO: Amount = Amount(0);

    pub const fn from_sat(sat: u64) -> Self {
        Amount(sat)
    }

    pub const fn to_sat(self) -> u64 {
        self.0
    }

    /// Parses a plain decimal string such as `1.5` or `0.00001000`.
    ///
    /// Signs, exponents and more fractional digits than `decimals` are
    /// rejected.
    pub fn from_str_in(s: &str, decimals: u32) -> Result<Amount, AmountError> {
        let invalid = || AmountError::Invalid(s.to_string());
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if s.contains('.') && frac_part.is_empty() {
            return Err(invalid());
        }
        if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let frac_trimmed = frac_part.trim_end_matches('0');
        if frac_trimmed.len() > decimals as usize {
            return Err(AmountError::TooPrecise {
                amount: s.to_string(),
                decimals,
            });
        }

        let unit = 10u64.checked_pow(decimals).ok_or(AmountError::Overflow)?;
        let whole: u64 = int_part.parse().map_err(|_| AmountError::Overflow)?;
        let mut frac: u64 = 0;
        for (i, b) in frac_trimmed.bytes().enumerate() {
            let digit = u64::from(b - b'0');
            frac += digit * 10u64.pow(decimals - 1 - i as u32);
        }
        whole
            .checked_mul(unit)
            .and_then(|w| w.checked_add(frac))
            .map(Amount)
            .ok_or(AmountError::Overflow)
    }

    /// Formats with trailing fractional zeros stripped: `1.5`, `0.00005`, `3`.
    pub fn to_string_in(self, decimals: u32) -> String {
        if decimals == 0 {
            return self.0.to_string();
        }
        let unit = 10u64.pow(decimals);
        let whole = self.0 / unit;
        let frac = self.0 % unit;
        if frac == 0 {
            return whole.to_string();
        }
        let frac = format!("{:0width$}", frac, width = decimals as usize);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }

    /// Reads an amount from a daemon JSON value, either a number or a string.
    ///
    /// Relies on `serde_json`'s `arbitrary_precision` so that numbers keep
    /// their exact textual form.
    pub fn from_json(value: &serde_json::Value, decimals: u32) -> Result<Amount, AmountError> {
        match value {
            serde_json::Value::Number(n) => Amount::from_str_in(&n.to_string(), decimals),
            serde_json::Value::String(s) => Amount::from_str_in(s, decimals),
            other => Err(AmountError::Invalid(other.to_string())),
        }
    }

    /// Exact JSON number for RPC payloads.
    pub fn to_json(self, decimals: u32) -> serde_json::Value {
        let s = self.to_string_in(decimals);
        match s.parse::<serde_json::Number>() {
            Ok(n) => serde_json::Value::Number(n),
            Err(_) => serde_json::Value::String(s),
        }
    }

    pub fn checked_add(self, rhs: Amount) -> Result<Amount, AmountError> {
        self.0.checked_add(rhs.0).map(Amount).ok_or(AmountError::Overflow)
    }

    pub fn checked_sub(self, rhs: Amount) -> Result<Amount, AmountError> {
        self.0.checked_sub(rhs.0).map(Amount).ok_or(AmountError::Underflow)
    }

    pub fn checked_mul(self, rhs: u64) -> Result<Amount, AmountError> {
        self.0.checked_mul(rhs).map(Amount).ok_or(AmountError::Overflow)
    }

    /// Sums amounts, failing on overflow.
    pub fn try_sum<I: IntoIterator<Item = Amount>>(iter: I) -> Result<Amount, AmountError> {
        iter.into_iter().try_fold(Amount::ZERO, Amount::checked_add)
    }
}

impl Sum for Amount {
    /// Saturating sum; use [`Amount::try_sum`] where overflow must be reported.
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        Amount(iter.fold(0u64, |acc, a| acc.saturating_add(a.0)))
    }
}

impl fmt::Display for Amount {
    /// Bitcoin-family formatting (8 decimals).
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_string_in(8))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Amount::from_str_in("1.5", 8).unwrap(), Amount::from_sat(150_000_000));
        assert_eq!(Amount::from_str_in("0.00001000", 8).unwrap(), Amount::from_sat(1000));
        assert_eq!(Amount::from_str_in("21000000", 8).unwrap().to_sat(), 2_100_000_000_000_000);
        assert_eq!(Amount::from_str_in("0.000000000001", 12).unwrap(), Amount::from_sat(1));
    }

    #[test]
    fn test_parse_rejects() {
        assert_matches!(Amount::from_str_in("-1", 8), Err(AmountError::Invalid(_)));
        assert_matches!(Amount::from_str_in("1e-5", 8), Err(AmountError::Invalid(_)));
        assert_matches!(Amount::from_str_in("", 8), Err(AmountError::Invalid(_)));
        assert_matches!(Amount::from_str_in(".5", 8), Err(AmountError::Invalid(_)));
        assert_matches!(Amount::from_str_in("1.", 8), Err(AmountError::Invalid(_)));
        assert_matches!(Amount::from_str_in("0.000000001", 8), Err(AmountError::TooPrecise { .. }));
        assert_matches!(Amount::from_str_in("999999999999", 8), Err(AmountError::Overflow));
    }

    #[test]
    fn test_format() {
        assert_eq!(Amount::from_sat(150_000_000).to_string_in(8), "1.5");
        assert_eq!(Amount::from_sat(5000).to_string_in(8), "0.00005");
        assert_eq!(Amount::from_sat(300_000_000).to_string(), "3");
        assert_eq!(Amount::ZERO.to_string(), "0");
    }

    #[test]
    fn test_json() {
        let v: serde_json::Value = serde_json::from_str(r#"{"relayfee": 0.00001000}"#).unwrap();
        assert_eq!(Amount::from_json(&v["relayfee"], 8).unwrap(), Amount::from_sat(1000));
        assert_eq!(Amount::from_sat(1).to_json(8).to_string(), "0.00000001");
    }

    #[test]
    fn test_checked_math() {
        let a = Amount::from_sat(10);
        assert_eq!(a.checked_sub(Amount::from_sat(3)).unwrap(), Amount::from_sat(7));
        assert_matches!(a.checked_sub(Amount::from_sat(11)), Err(AmountError::Underflow));
        assert_matches!(Amount::from_sat(u64::MAX).checked_add(a), Err(AmountError::Overflow));
        assert_eq!(Amount::try_sum([a, a, a]).unwrap(), Amount::from_sat(30));
    }
}
