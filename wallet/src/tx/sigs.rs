// SPDX-License-Identifier: CC0-1.0

//! Structural signature checks on daemon-signed transactions.
//!
//! Nothing here verifies a signature cryptographically. The checks only make
//! sure every input carries data shaped like a signature for its input type.

use crate::deserialize::{DeserializedInput, DeserializedTx};
use crate::error::{TxError, TxResult};

const P2SH_P2WPKH_PREFIX: [u8; 3] = [0x16, 0x00, 0x14];
const P2SH_P2WPKH_SCRIPT_SIG_LEN: usize = 23;
const WITNESS_PUBKEY_LEN: usize = 33;

/// Returns false when no input has a scriptSig or witness; errors if any
/// input is signed in an unexpected shape.
pub(super) fn verify_sigs(dt: &DeserializedTx) -> TxResult<bool> {
    let has_sig_data = dt.inputs.iter().any(|i| !i.script_sig.is_empty() || i.witness.is_some());
    if !has_sig_data {
        return Ok(false);
    }
    for (index, input) in dt.inputs.iter().enumerate() {
        check_input(index, input)?;
    }
    Ok(true)
}

fn check_input(index: usize, input: &DeserializedInput) -> TxResult<()> {
    let malformed = |reason| TxError::MalformedSignature {
        index,
        reason,
    };
    let ss = &input.script_sig;

    if ss.len() == P2SH_P2WPKH_SCRIPT_SIG_LEN && ss.starts_with(&P2SH_P2WPKH_PREFIX) {
        let witness = input.witness.as_ref().ok_or_else(|| malformed("missing witness"))?;
        match witness.as_slice() {
            [_sig, pubkey] if pubkey.len() == WITNESS_PUBKEY_LEN => Ok(()),
            [_, _] => Err(malformed("incorrect witness pubkey length")),
            _ => Err(malformed("malformed witness")),
        }
    } else if ss.is_empty() {
        match input.witness {
            Some(_) => Err(TxError::NativeSegwitUnsupported(index)),
            None => Err(TxError::MissingSignature(index)),
        }
    } else if input.witness.is_some() {
        Err(malformed("non-witness input has witness"))
    } else if ss.len() > 100 && ss.len() < 150 {
        // DER signature of up to 72 bytes plus a 33 or 65 byte pubkey
        Ok(())
    } else {
        Err(malformed("malformed scriptSig"))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::transaction::Txid;

    fn input(script_sig: Vec<u8>, witness: Option<Vec<Vec<u8>>>) -> DeserializedInput {
        DeserializedInput {
            txid: Txid::from_byte_array([0x11; 32]),
            vout: 0,
            script_sig,
            sequence: 0xffff_ffff,
            witness,
        }
    }

    fn tx(inputs: Vec<DeserializedInput>) -> DeserializedTx {
        DeserializedTx {
            txid: Txid::from_byte_array([0; 32]),
            version: 2,
            lock_time: 0,
            witness_size: 0,
            inputs,
            outputs: vec![],
            unsigned_hex: String::new(),
        }
    }

    fn p2sh_p2wpkh_script_sig() -> Vec<u8> {
        let mut ss = P2SH_P2WPKH_PREFIX.to_vec();
        ss.extend_from_slice(&[0xab; 20]);
        ss
    }

    #[test]
    fn test_unsigned() {
        assert!(!verify_sigs(&tx(vec![input(vec![], None), input(vec![], None)])).unwrap());
    }

    #[test]
    fn test_legacy() {
        assert!(verify_sigs(&tx(vec![input(vec![0x30; 106], None)])).unwrap());
        assert_matches!(
            verify_sigs(&tx(vec![input(vec![0x30; 100], None)])),
            Err(TxError::MalformedSignature { index: 0, .. })
        );
        assert_matches!(
            verify_sigs(&tx(vec![input(vec![0x30; 106], Some(vec![vec![1]]))])),
            Err(TxError::MalformedSignature { .. })
        );
    }

    #[test]
    fn test_partially_signed() {
        let inputs = vec![input(vec![0x30; 106], None), input(vec![], None)];
        assert_matches!(verify_sigs(&tx(inputs)), Err(TxError::MissingSignature(1)));
    }

    #[test]
    fn test_p2sh_p2wpkh() {
        let good = Some(vec![vec![0x30; 72], vec![0x02; 33]]);
        assert!(verify_sigs(&tx(vec![input(p2sh_p2wpkh_script_sig(), good)])).unwrap());

        let bad_pubkey = Some(vec![vec![0x30; 72], vec![0x04; 65]]);
        assert_matches!(
            verify_sigs(&tx(vec![input(p2sh_p2wpkh_script_sig(), bad_pubkey)])),
            Err(TxError::MalformedSignature { reason: "incorrect witness pubkey length", .. })
        );
        assert_matches!(
            verify_sigs(&tx(vec![input(p2sh_p2wpkh_script_sig(), None)])),
            Err(TxError::MalformedSignature { reason: "missing witness", .. })
        );
    }

    #[test]
    fn test_native_segwit_rejected() {
        let inputs = vec![input(vec![], Some(vec![vec![0x30; 72], vec![0x02; 33]]))];
        assert_matches!(verify_sigs(&tx(inputs)), Err(TxError::NativeSegwitUnsupported(0)));
    }
}
