// SPDX-License-Identifier: CC0-1.0

//! Checks that transaction hex handed back by a daemon is the transaction the
//! wallet built.
//!
//! The daemon is not trusted. A compromised or buggy node could swap an
//! output address or amount while returning otherwise plausible data, so the
//! hex is decoded independently and compared field by field with the model.

use tracing::error;

use crate::checksum::make_chksum_6;
use crate::deserialize::DeserializedTx;
use crate::error::{DecodeError, IntegrityError};
use crate::tx::Tx;

/// Fails if `dt` disagrees with `tx` in lock time, inputs, outputs or id.
pub fn check_hex_matches(tx: &Tx, dt: &DeserializedTx) -> Result<(), IntegrityError> {
    let expected_locktime = tx.locktime.unwrap_or(0);
    if dt.lock_time != expected_locktime {
        error!(expected = expected_locktime, found = dt.lock_time, "lock time mismatch in daemon data");
        return Err(IntegrityError::LockTime {
            expected: expected_locktime,
            found: dt.lock_time,
        });
    }

    let mut wallet_ins: Vec<(String, u32)> = tx.inputs.iter().map(|i| (i.txid.to_string(), i.vout)).collect();
    let mut hex_ins: Vec<(String, u32)> = dt.inputs.iter().map(|i| (i.txid.to_string(), i.vout)).collect();
    wallet_ins.sort();
    hex_ins.sort();
    if wallet_ins != hex_ins {
        error!(wallet = ?wallet_ins, hex = ?hex_ins, "inputs mismatch in daemon data");
        return Err(IntegrityError::Inputs {
            wallet: wallet_ins,
            hex: hex_ins,
        });
    }

    let mut wallet_outs: Vec<(String, u64)> = tx.outputs.iter().map(|o| (o.addr.clone(), o.amount.to_sat())).collect();
    let mut hex_outs: Vec<(String, u64)> =
        dt.outputs.iter().map(|o| (o.address.clone(), o.amount.to_sat())).collect();
    wallet_outs.sort();
    hex_outs.sort();
    if wallet_outs != hex_outs {
        error!(wallet = ?wallet_outs, hex = ?hex_outs, "outputs mismatch in daemon data");
        return Err(IntegrityError::Outputs {
            wallet: wallet_outs,
            hex: hex_outs,
        });
    }

    let unsigned = hex::decode(&dt.unsigned_hex).map_err(DecodeError::from)?;
    let found = make_chksum_6(&unsigned).to_uppercase();
    let expected = tx.txid.as_ref().map(|t| t.as_str()).unwrap_or_default();
    if expected != found {
        return Err(IntegrityError::TxidMismatch {
            expected: expected.to_string(),
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::amount::Amount;
    use crate::tx::tests::{SEGWIT_TX, SEGWIT_UNSIGNED, sample_tx};

    fn decoded(hex: &str) -> DeserializedTx {
        let tx = sample_tx();
        DeserializedTx::from_hex(hex, tx.proto()).unwrap()
    }

    fn with_id() -> Tx {
        let mut tx = sample_tx();
        tx.txid = Some("EEF1BF".parse().unwrap());
        tx
    }

    #[test]
    fn test_matching() {
        check_hex_matches(&with_id(), &decoded(SEGWIT_UNSIGNED)).unwrap();
        check_hex_matches(&with_id(), &decoded(SEGWIT_TX)).unwrap();
    }

    #[test]
    fn test_output_order_irrelevant() {
        let mut tx = with_id();
        tx.outputs.reverse();
        check_hex_matches(&tx, &decoded(SEGWIT_UNSIGNED)).unwrap();
    }

    #[test]
    fn test_locktime() {
        let mut tx = with_id();
        tx.locktime = Some(700_000);
        assert_matches!(
            check_hex_matches(&tx, &decoded(SEGWIT_UNSIGNED)),
            Err(IntegrityError::LockTime { expected: 700_000, found: 0 })
        );
    }

    #[test]
    fn test_swapped_address() {
        let mut tx = with_id();
        tx.outputs[0].addr = "1KhAQw5BU3i4G8BDGpw8YqUKRLuW3mQdh".into();
        assert_matches!(check_hex_matches(&tx, &decoded(SEGWIT_UNSIGNED)), Err(IntegrityError::Outputs { .. }));
    }

    #[test]
    fn test_changed_amount() {
        let mut tx = with_id();
        tx.outputs[1].amount = Amount::from_sat(49_990_001);
        assert_matches!(check_hex_matches(&tx, &decoded(SEGWIT_UNSIGNED)), Err(IntegrityError::Outputs { .. }));
    }

    #[test]
    fn test_inputs() {
        let mut tx = with_id();
        tx.inputs[0].vout = 0;
        assert_matches!(check_hex_matches(&tx, &decoded(SEGWIT_UNSIGNED)), Err(IntegrityError::Inputs { .. }));
    }

    #[test]
    fn test_daemon_swapped_input_txid() {
        // same vout, different previous transaction
        let input = |byte: &str| format!("01{}01000000", byte.repeat(32));
        let swapped = SEGWIT_UNSIGNED.replacen(&input("11"), &input("22"), 1);
        assert_ne!(swapped, SEGWIT_UNSIGNED);
        let dt = decoded(&swapped);
        assert_eq!(dt.inputs[0].vout, 1);
        assert_matches!(check_hex_matches(&with_id(), &dt), Err(IntegrityError::Inputs { .. }));
    }

    #[test]
    fn test_txid() {
        let mut tx = with_id();
        tx.txid = Some("3141D5".parse().unwrap());
        assert_matches!(
            check_hex_matches(&tx, &decoded(SEGWIT_UNSIGNED)),
            Err(IntegrityError::TxidMismatch { .. })
        );
        tx.txid = None;
        assert_matches!(
            check_hex_matches(&tx, &decoded(SEGWIT_UNSIGNED)),
            Err(IntegrityError::TxidMismatch { .. })
        );
    }
}
