// Coldwallet transaction core
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the CC0 Public Domain Dedication
// along with this software.
// If not, see <http://creativecommons.org/publicdomain/zero/1.0/>.
//

//! Raw UTXO transactions.
//!
//! Wire format, with the segregated-witness extension:
//!
//! ```text
//! version(4) [marker(1)=0x00 flag(1)=0x01] n_in txin* n_out txout* [witness*] lock_time(4)
//! ```
//!
//! Decoding is strict: any structural mismatch is an error, since the bytes
//! usually come from a daemon the wallet does not trust.

use std::fmt;
use std::io;
use std::str::FromStr;

use crate::checksum::sha256d;
use crate::error::{DecodeError, DecodeResult};
use crate::varint::{ByteCursor, Consume, VarInt};

/// Smallest possible serialized input: outpoint, empty script, sequence.
const MIN_TXIN_SIZE: u64 = 32 + 4 + 1 + 4;
/// Smallest possible serialized output: value, empty script.
const MIN_TXOUT_SIZE: u64 = 8 + 1;

/// Sequence number signalling opt-in replace-by-fee on the first input.
pub const RBF_SEQUENCE: u32 = 0xffff_fffd;

/// A transaction hash, stored in hashing byte order and displayed reversed.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Txid([u8; 32]);

impl Txid {
    pub const fn from_byte_array(bytes: [u8; 32]) -> Self {
        Txid(bytes)
    }

    pub fn as_byte_array(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut rev = self.0;
        rev.reverse();
        f.write_str(&hex::encode(rev))
    }
}

impl fmt::Debug for Txid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Txid({})", self)
    }
}

impl FromStr for Txid {
    type Err = DecodeError;

    /// Parses the usual reversed display form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        bytes.reverse();
        Ok(Txid(bytes))
    }
}

/// Reference to a previous transaction output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OutPoint {
    pub txid: Txid,
    pub vout: u32,
}

/// A transaction input.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TxIn {
    pub previous_output: OutPoint,
    /// Unlocking script. Empty for unsigned inputs and native witness spends.
    pub script_sig: Vec<u8>,
    pub sequence: u32,
    /// Witness stack. Empty for non-witness inputs.
    pub witness: Vec<Vec<u8>>,
}

/// A transaction output.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TxOut {
    /// Value in minimal units.
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

/// A raw transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Transaction {
    /// Protocol version. Negative versions are rejected on decode.
    pub version: i32,
    pub lock_time: u32,
    pub input: Vec<TxIn>,
    pub output: Vec<TxOut>,
}

/// Result of decoding raw transaction bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub tx: Transaction,
    /// Canonical unsigned serialization: scripts nulled, witness stripped.
    pub unsigned: Vec<u8>,
    /// Bytes of witness data plus marker and flag, zero without witness.
    pub witness_size: usize,
}

impl Transaction {
    /// Whether any input carries witness data, and hence whether the
    /// extended serialization is used.
    pub fn has_witness(&self) -> bool {
        self.input.iter().any(|i| !i.witness.is_empty())
    }

    /// Computes the txid: double SHA-256 of the non-witness serialization.
    pub fn txid(&self) -> Txid {
        let mut buf = Vec::with_capacity(self.base_size());
        self.encode_base(&mut buf).expect("writing to a Vec never fails");
        Txid(sha256d(&buf))
    }

    /// Whether the first input signals replace-by-fee.
    pub fn is_explicitly_rbf(&self) -> bool {
        self.input.first().is_some_and(|i| i.sequence == RBF_SEQUENCE)
    }

    /// Size of the serialization without witness data.
    pub fn base_size(&self) -> usize {
        let inputs: usize = self
            .input
            .iter()
            .map(|i| 36 + VarInt(i.script_sig.len() as u64).len() + i.script_sig.len() + 4)
            .sum();
        let outputs: usize = self
            .output
            .iter()
            .map(|o| 8 + VarInt(o.script_pubkey.len() as u64).len() + o.script_pubkey.len())
            .sum();
        4 + VarInt(self.input.len() as u64).len()
            + inputs
            + VarInt(self.output.len() as u64).len()
            + outputs
            + 4
    }

    /// Size of the full serialization.
    pub fn total_size(&self) -> usize {
        if !self.has_witness() {
            return self.base_size();
        }
        let witness: usize = self
            .input
            .iter()
            .map(|i| {
                VarInt(i.witness.len() as u64).len()
                    + i.witness.iter().map(|w| VarInt(w.len() as u64).len() + w.len()).sum::<usize>()
            })
            .sum();
        self.base_size() + 2 + witness
    }

    /// Virtual size: `ceil((3 * base + total) / 4)`.
    pub fn vsize(&self) -> usize {
        (3 * self.base_size() + self.total_size()).div_ceil(4)
    }

    /// Serializes in wire format, using the witness extension when any input
    /// has witness data.
    pub fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> io::Result<usize> {
        if !self.has_witness() {
            return self.encode_base(w);
        }
        let mut len = 0;
        w.write_all(&self.version.to_le_bytes())?;
        w.write_all(&[0x00, 0x01])?;
        len += 6;
        len += self.encode_io(w)?;
        for input in &self.input {
            len += VarInt(input.witness.len() as u64).consensus_encode(w)?;
            for item in &input.witness {
                len += encode_bytes(item, w)?;
            }
        }
        w.write_all(&self.lock_time.to_le_bytes())?;
        Ok(len + 4)
    }

    /// Wire bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.total_size());
        self.consensus_encode(&mut buf).expect("writing to a Vec never fails");
        buf
    }

    /// Decodes a complete transaction, rejecting trailing bytes.
    pub fn deserialize(bytes: &[u8]) -> DecodeResult<Transaction> {
        Transaction::decode(bytes).map(|d| d.tx)
    }

    /// Decodes a complete transaction and rebuilds its canonical unsigned
    /// form alongside.
    pub fn decode(bytes: &[u8]) -> DecodeResult<Decoded> {
        let mut cur = ByteCursor::new(bytes);

        let version = cur.read_u32_le(Consume::Append)?;
        check_sign(u64::from(version), 32, "version")?;

        let flagged = cur.peek() == Some(0x00);
        if flagged {
            cur.take(1, Consume::Skip)?;
            let flag = cur.take(1, Consume::Skip)?[0];
            if flag != 0x01 {
                return Err(DecodeError::IllegalFlag(flag));
            }
        }

        let n_in = cur.read_varint(Consume::Append)?;
        check_count(n_in, MIN_TXIN_SIZE, cur.remaining())?;
        let mut input = Vec::with_capacity(n_in as usize);
        for _ in 0..n_in {
            let txid = Txid(cur.take_array(Consume::Append)?);
            let vout = cur.read_u32_le(Consume::Append)?;
            check_sign(u64::from(vout), 32, "vout")?;
            let script_len = cur.read_length(Consume::SubNull)?;
            let script_sig = cur.take(script_len, Consume::Skip)?.to_vec();
            let sequence = cur.read_u32_le(Consume::Append)?;
            input.push(TxIn {
                previous_output: OutPoint {
                    txid,
                    vout,
                },
                script_sig,
                sequence,
                witness: Vec::new(),
            });
        }

        let n_out = cur.read_varint(Consume::Append)?;
        check_count(n_out, MIN_TXOUT_SIZE, cur.remaining())?;
        let mut output = Vec::with_capacity(n_out as usize);
        for _ in 0..n_out {
            let value = cur.read_u64_le(Consume::Append)?;
            check_sign(value, 64, "amount")?;
            let script_len = cur.read_length(Consume::Append)?;
            let script_pubkey = cur.take(script_len, Consume::Append)?.to_vec();
            output.push(TxOut {
                value,
                script_pubkey,
            });
        }

        let mut witness_size = 0;
        if flagged {
            let region_len = cur.remaining().checked_sub(4).ok_or(DecodeError::UnexpectedEnd {
                offset: cur.position(),
                needed: 4,
                remaining: cur.remaining(),
            })?;
            let region = cur.take(region_len, Consume::Skip)?;
            witness_size = region.len() + 2;
            let mut wd = ByteCursor::new(region);
            for txin in input.iter_mut() {
                let items = wd.read_varint(Consume::Skip)?;
                check_count(items, 1, wd.remaining())?;
                for _ in 0..items {
                    let len = wd.read_length(Consume::Skip)?;
                    txin.witness.push(wd.take(len, Consume::Skip)?.to_vec());
                }
            }
            if wd.remaining() > 0 {
                return Err(DecodeError::ExcessWitnessData);
            }
            if input.iter().all(|i| i.witness.is_empty()) {
                return Err(DecodeError::SuperfluousWitness);
            }
        }

        let lock_time = cur.read_u32_le(Consume::Append)?;
        check_sign(u64::from(lock_time), 32, "lock time")?;
        if cur.remaining() > 0 {
            return Err(DecodeError::TrailingData(cur.remaining()));
        }

        Ok(Decoded {
            tx: Transaction {
                version: version as i32,
                lock_time,
                input,
                output,
            },
            unsigned: cur.into_canonical(),
            witness_size,
        })
    }

    fn encode_base<W: io::Write + ?Sized>(&self, w: &mut W) -> io::Result<usize> {
        w.write_all(&self.version.to_le_bytes())?;
        let len = 4 + self.encode_io(w)?;
        w.write_all(&self.lock_time.to_le_bytes())?;
        Ok(len + 4)
    }

    fn encode_io<W: io::Write + ?Sized>(&self, w: &mut W) -> io::Result<usize> {
        let mut len = VarInt(self.input.len() as u64).consensus_encode(w)?;
        for input in &self.input {
            w.write_all(&input.previous_output.txid.0)?;
            w.write_all(&input.previous_output.vout.to_le_bytes())?;
            len += 36;
            len += encode_bytes(&input.script_sig, w)?;
            w.write_all(&input.sequence.to_le_bytes())?;
            len += 4;
        }
        len += VarInt(self.output.len() as u64).consensus_encode(w)?;
        for output in &self.output {
            w.write_all(&output.value.to_le_bytes())?;
            len += 8;
            len += encode_bytes(&output.script_pubkey, w)?;
        }
        Ok(len)
    }
}

fn encode_bytes<W: io::Write + ?Sized>(bytes: &[u8], w: &mut W) -> io::Result<usize> {
    let len = VarInt(bytes.len() as u64).consensus_encode(w)?;
    w.write_all(bytes)?;
    Ok(len + bytes.len())
}

/// Rejects values whose top bit is set.
fn check_sign(value: u64, bits: u32, field: &'static str) -> DecodeResult<()> {
    if value >> (bits - 1) & 1 == 1 {
        return Err(DecodeError::NegativeValue(field));
    }
    Ok(())
}

fn check_count(count: u64, min_item_size: u64, remaining: usize) -> DecodeResult<()> {
    if count.saturating_mul(min_item_size) > remaining as u64 {
        return Err(DecodeError::OversizedCount(count));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const LEGACY_TX: &str = "0100000001a15d57094aa7a21a28cb20b59aab8fc7d1149a3bdbcddba9c622e4f5f6a99ece010000006c493046022100f93bb0e7d8db7bd46e40132d1f8242026e045f03a0efe71bbb8e3f475e970d790221009337cd7f1f929f00cc6ff01f03729b069a7c21b59b1736ddfee5db5946c5da8c0121033b9b137ee87d5a812d6f506efdd37f0affa7ffc310711c06c7f3e097c9447c52ffffffff0100e1f505000000001976a9140389035a9225b3839e2bbf32d826a1e222031fd888ac00000000";

    const SEGWIT_TX: &str = "02000000000101111111111111111111111111111111111111111111111111111111111111111101000000171600140123456789abcdef0123456789abcdef01234567fdffffff0280d1f008000000001976a91400112233445566778899aabbccddeeff0011223388ac70c9fa020000000017a914ffeeddccbbaa99887766554433221100ffeeddcc870248300102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f202122232425262728292a2b2c2d2e2f303132333435363738393a3b3c3d3e3f40414243444546472102abababababababababababababababababababababababababababababababab00000000";

    #[test]
    fn test_legacy_deserialization() {
        let bytes = hex::decode(LEGACY_TX).unwrap();
        let decoded = Transaction::decode(&bytes).unwrap();
        let tx = &decoded.tx;
        assert_eq!(tx.version, 1);
        assert_eq!(tx.lock_time, 0);
        assert_eq!(tx.input.len(), 1);
        assert_eq!(
            tx.input[0].previous_output.txid.to_string(),
            "ce9ea9f6f5e422c6a9dbcddb3b9a14d1c78fab9ab520cb281aa2a74a09575da1"
        );
        assert_eq!(tx.input[0].previous_output.vout, 1);
        assert_eq!(tx.input[0].script_sig.len(), 0x6c);
        assert_eq!(tx.input[0].sequence, 0xffffffff);
        assert_eq!(tx.output[0].value, 100_000_000);
        assert_eq!(
            tx.txid().to_string(),
            "a6eab3c14ab5272a58a5ba91505ba1a4b6d7a3a9fcbd187b6cd99a7b6d548cb7"
        );
        assert_eq!(decoded.witness_size, 0);
        assert_eq!(
            hex::encode(&decoded.unsigned),
            "0100000001a15d57094aa7a21a28cb20b59aab8fc7d1149a3bdbcddba9c622e4f5f6a99ece0100000000ffffffff0100e1f505000000001976a9140389035a9225b3839e2bbf32d826a1e222031fd888ac00000000"
        );
        assert_eq!(tx.base_size(), bytes.len());
        assert_eq!(tx.vsize(), bytes.len());
    }

    #[test]
    fn test_segwit_deserialization() {
        let bytes = hex::decode(SEGWIT_TX).unwrap();
        let decoded = Transaction::decode(&bytes).unwrap();
        let tx = &decoded.tx;
        assert_eq!(tx.version, 2);
        assert!(tx.has_witness());
        assert!(tx.is_explicitly_rbf());
        assert_eq!(tx.input[0].witness.len(), 2);
        assert_eq!(tx.input[0].witness[0].len(), 72);
        assert_eq!(tx.input[0].witness[1].len(), 33);
        assert_eq!(decoded.witness_size, 110);
        assert_eq!(
            tx.txid().to_string(),
            "571efea453dd2ca8fa254c2aefb7ecdd143139a2e0aaefc07439b7f95dcf250d"
        );
        assert_eq!(tx.total_size(), bytes.len());
        assert_eq!(tx.base_size() + 110, bytes.len());
    }

    #[test]
    fn test_round_trip() {
        for raw in [LEGACY_TX, SEGWIT_TX] {
            let bytes = hex::decode(raw).unwrap();
            let tx = Transaction::deserialize(&bytes).unwrap();
            assert_eq!(tx.serialize(), bytes);
            assert_eq!(Transaction::deserialize(&tx.serialize()).unwrap(), tx);
        }
    }

    #[test]
    fn test_txid_ignores_witness() {
        let mut tx = Transaction::deserialize(&hex::decode(SEGWIT_TX).unwrap()).unwrap();
        let txid = tx.txid();
        tx.input[0].witness[0] = vec![0x30; 71];
        tx.input[0].witness.push(vec![0x01]);
        assert_eq!(tx.txid(), txid);
        let reparsed = Transaction::decode(&tx.serialize()).unwrap();
        assert_eq!(reparsed.tx.txid(), txid);
    }

    #[test]
    fn test_illegal_flag() {
        let mut bytes = hex::decode(SEGWIT_TX).unwrap();
        bytes[5] = 0x02;
        assert_matches!(Transaction::decode(&bytes), Err(DecodeError::IllegalFlag(0x02)));
    }

    #[test]
    fn test_excess_witness_data() {
        let mut bytes = hex::decode(SEGWIT_TX).unwrap();
        let at = bytes.len() - 4;
        bytes.insert(at, 0x00);
        assert_matches!(Transaction::decode(&bytes), Err(DecodeError::ExcessWitnessData));
    }

    #[test]
    fn test_truncated_and_trailing() {
        let bytes = hex::decode(LEGACY_TX).unwrap();
        assert_matches!(
            Transaction::decode(&bytes[..bytes.len() - 1]),
            Err(DecodeError::UnexpectedEnd { .. })
        );
        let mut extra = bytes.clone();
        extra.push(0x00);
        assert_matches!(Transaction::decode(&extra), Err(DecodeError::TrailingData(1)));
    }

    #[test]
    fn test_negative_values() {
        let mut bytes = hex::decode(LEGACY_TX).unwrap();
        bytes[3] = 0x80;
        assert_matches!(Transaction::decode(&bytes), Err(DecodeError::NegativeValue("version")));

        let mut bytes = hex::decode(LEGACY_TX).unwrap();
        // high byte of the output amount
        let amount_end = bytes.len() - 4 - 26;
        bytes[amount_end - 1] = 0xff;
        assert_matches!(Transaction::decode(&bytes), Err(DecodeError::NegativeValue("amount")));
    }

    #[test]
    fn test_txid_parse() {
        let s = "ce9ea9f6f5e422c6a9dbcddb3b9a14d1c78fab9ab520cb281aa2a74a09575da1";
        let txid: Txid = s.parse().unwrap();
        assert_eq!(txid.to_string(), s);
        assert_eq!(txid.as_byte_array()[0], 0xa1);
        assert!("abcd".parse::<Txid>().is_err());
    }
}
