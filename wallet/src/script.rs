// SPDX-License-Identifier: CC0-1.0

//! Output script classification.
//!
//! Only the two pay-to templates are understood. Anything else is refused
//! outright instead of being guessed at.

use coldwallet_network::Protocol;

use crate::error::{DecodeError, DecodeResult};

const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_PUSHBYTES_20: u8 = 0x14;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;
const OP_EQUAL: u8 = 0x87;

/// Address format of a recognized output script.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AddrFormat {
    /// Pay to public key hash.
    P2pkh,
    /// Pay to script hash.
    P2sh,
}

impl AddrFormat {
    /// Estimated serialized output size for fee calculation.
    pub fn output_size(self) -> usize {
        match self {
            AddrFormat::P2pkh => 34,
            AddrFormat::P2sh => 32,
        }
    }
}

/// Splits a locking script into its template and 20-byte hash.
pub fn classify(script: &[u8]) -> DecodeResult<(AddrFormat, [u8; 20])> {
    let mut hash = [0u8; 20];
    match script {
        [OP_DUP, OP_HASH160, OP_PUSHBYTES_20, body @ .., OP_EQUALVERIFY, OP_CHECKSIG]
            if body.len() == 20 =>
        {
            hash.copy_from_slice(body);
            Ok((AddrFormat::P2pkh, hash))
        }
        [OP_HASH160, OP_PUSHBYTES_20, body @ .., OP_EQUAL] if body.len() == 20 => {
            hash.copy_from_slice(body);
            Ok((AddrFormat::P2sh, hash))
        }
        _ => Err(DecodeError::UnrecognizedScript(hex::encode(script))),
    }
}

/// Base58Check address for a hash of the given format.
pub fn hash_to_address(format: AddrFormat, hash: &[u8; 20], proto: &Protocol) -> String {
    let version = match format {
        AddrFormat::P2pkh => proto.p2pkh_version(),
        AddrFormat::P2sh => proto.p2sh_version(),
    };
    bs58::encode(hash).with_check_version(version).into_string()
}

/// Maps a recognized locking script to its address.
pub fn script_to_address(script: &[u8], proto: &Protocol) -> DecodeResult<String> {
    let (format, hash) = classify(script)?;
    Ok(hash_to_address(format, &hash, proto))
}

/// Decodes an address for `proto`, returning its format and hash.
pub fn parse_address(addr: &str, proto: &Protocol) -> DecodeResult<(AddrFormat, [u8; 20])> {
    let invalid = |reason: String| DecodeError::InvalidAddress {
        addr: addr.to_string(),
        reason,
    };
    let payload = bs58::decode(addr).with_check(None).into_vec().map_err(|e| invalid(e.to_string()))?;
    let (version, hash) = payload.split_first().ok_or_else(|| invalid("empty payload".into()))?;
    if hash.len() != 20 {
        return Err(invalid(format!("hash length {}", hash.len())));
    }
    let format = if *version == proto.p2pkh_version() {
        AddrFormat::P2pkh
    } else if *version == proto.p2sh_version() {
        AddrFormat::P2sh
    } else {
        return Err(invalid(format!("version byte {:#04x} not valid for {}", version, proto)));
    };
    let mut out = [0u8; 20];
    out.copy_from_slice(hash);
    Ok((format, out))
}

/// Builds the locking script paying to `addr`.
pub fn address_to_script(addr: &str, proto: &Protocol) -> DecodeResult<Vec<u8>> {
    let (format, hash) = parse_address(addr, proto)?;
    let mut script = Vec::with_capacity(25);
    match format {
        AddrFormat::P2pkh => {
            script.extend_from_slice(&[OP_DUP, OP_HASH160, OP_PUSHBYTES_20]);
            script.extend_from_slice(&hash);
            script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        }
        AddrFormat::P2sh => {
            script.extend_from_slice(&[OP_HASH160, OP_PUSHBYTES_20]);
            script.extend_from_slice(&hash);
            script.push(OP_EQUAL);
        }
    }
    Ok(script)
}
