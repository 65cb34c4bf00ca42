// SPDX-License-Identifier: CC0-1.0

//! Compact-size integers and the byte cursor used by the transaction decoder.
//!
//! Besides handing out bytes, [`ByteCursor`] rebuilds a second byte string
//! alongside the read: the canonical *unsigned* form of the transaction, with
//! signatures and witness data removed. The checksum of that string is the
//! wallet's transaction id, which must not move as signatures are added.

use std::io;

use crate::error::{DecodeError, DecodeResult};

/// A Bitcoin compact-size unsigned integer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarInt(pub u64);

impl VarInt {
    /// Encoded length in bytes: 1, 3, 5 or 9.
    #[inline]
    pub const fn len(&self) -> usize {
        match self.0 {
            0..=0xFC => 1,
            0xFD..=0xFFFF => 3,
            0x10000..=0xFFFFFFFF => 5,
            _ => 9,
        }
    }

    /// Always false; present for symmetry with `len`.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        false
    }

    pub fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> io::Result<usize> {
        match self.0 {
            0..=0xFC => w.write_all(&[self.0 as u8])?,
            0xFD..=0xFFFF => {
                w.write_all(&[0xFD])?;
                w.write_all(&(self.0 as u16).to_le_bytes())?;
            }
            0x10000..=0xFFFFFFFF => {
                w.write_all(&[0xFE])?;
                w.write_all(&(self.0 as u32).to_le_bytes())?;
            }
            _ => {
                w.write_all(&[0xFF])?;
                w.write_all(&self.0.to_le_bytes())?;
            }
        }
        Ok(self.len())
    }
}

/// How consumed bytes are reflected in the canonical unsigned form.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Consume {
    /// Copy the bytes.
    Append,
    /// Leave the bytes out.
    Skip,
    /// Write a single `0x00` in place of the bytes.
    SubNull,
}

/// Forward-only reader over raw transaction bytes.
#[derive(Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    canonical: Vec<u8>,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            canonical: Vec::with_capacity(data.len()),
        }
    }

    /// Current offset into the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Next byte without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Canonical bytes rebuilt so far.
    pub fn canonical(&self) -> &[u8] {
        &self.canonical
    }

    pub fn into_canonical(self) -> Vec<u8> {
        self.canonical
    }

    /// Removes and returns the next `count` bytes.
    pub fn take(&mut self, count: usize, mode: Consume) -> DecodeResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(DecodeError::UnexpectedEnd {
                offset: self.pos,
                needed: count,
                remaining: self.remaining(),
            });
        }
        let data: &'a [u8] = self.data;
        let bytes = &data[self.pos..self.pos + count];
        self.pos += count;
        self.record(bytes, mode);
        Ok(bytes)
    }

    /// Like [`ByteCursor::take`], with the returned bytes in reverse order for
    /// display of little-endian fields.
    pub fn take_reversed(&mut self, count: usize, mode: Consume) -> DecodeResult<Vec<u8>> {
        let mut bytes = self.take(count, mode)?.to_vec();
        bytes.reverse();
        Ok(bytes)
    }

    pub fn take_array<const N: usize>(&mut self, mode: Consume) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, mode)?);
        Ok(out)
    }

    pub fn read_u32_le(&mut self, mode: Consume) -> DecodeResult<u32> {
        Ok(u32::from_le_bytes(self.take_array(mode)?))
    }

    pub fn read_u64_le(&mut self, mode: Consume) -> DecodeResult<u64> {
        Ok(u64::from_le_bytes(self.take_array(mode)?))
    }

    /// Reads a compact-size integer.
    ///
    /// With [`Consume::SubNull`] the whole encoding, prefix included, is
    /// replaced by one null byte.
    pub fn read_varint(&mut self, mode: Consume) -> DecodeResult<u64> {
        let inner = match mode {
            Consume::Append => Consume::Append,
            Consume::Skip | Consume::SubNull => Consume::Skip,
        };
        let first = self.take(1, inner)?[0];
        let value = match first {
            0xFF => self.read_u64_le(inner)?,
            0xFE => u64::from(self.read_u32_le(inner)?),
            0xFD => u64::from(u16::from_le_bytes(self.take_array(inner)?)),
            b => u64::from(b),
        };
        if mode == Consume::SubNull {
            self.canonical.push(0);
        }
        Ok(value)
    }

    /// Reads a compact-size length and checks it fits in what is left.
    pub fn read_length(&mut self, mode: Consume) -> DecodeResult<usize> {
        let len = self.read_varint(mode)?;
        if len > self.remaining() as u64 {
            return Err(DecodeError::OversizedCount(len));
        }
        Ok(len as usize)
    }

    fn record(&mut self, bytes: &[u8], mode: Consume) {
        match mode {
            Consume::Append => self.canonical.extend_from_slice(bytes),
            Consume::Skip => {}
            Consume::SubNull => self.canonical.push(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_varint_decode() {
        let mut c = ByteCursor::new(&[0xfd, 0x03, 0x02]);
        assert_eq!(c.read_varint(Consume::Append).unwrap(), 515);
        assert_eq!(c.remaining(), 0);

        let mut c = ByteCursor::new(&[0x0a]);
        assert_eq!(c.read_varint(Consume::Append).unwrap(), 10);

        let mut c = ByteCursor::new(&[0xff, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
        assert_eq!(c.read_varint(Consume::Append).unwrap(), 0x0807060504030201);

        let mut c = ByteCursor::new(&[0xfe, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(c.read_varint(Consume::Append).unwrap(), 0x12345678);
    }

    #[test]
    fn test_varint_encode() {
        let cases: [(u64, &[u8]); 4] = [
            (10, &[0x0a]),
            (515, &[0xfd, 0x03, 0x02]),
            (0x12345678, &[0xfe, 0x78, 0x56, 0x34, 0x12]),
            (0x0807060504030201, &[0xff, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]),
        ];
        for (value, bytes) in cases {
            let mut buf = Vec::new();
            assert_eq!(VarInt(value).consensus_encode(&mut buf).unwrap(), bytes.len());
            assert_eq!(buf, bytes);
            assert_eq!(VarInt(value).len(), bytes.len());
        }
    }

    #[test]
    fn test_truncated() {
        let mut c = ByteCursor::new(&[0xfd, 0x03]);
        assert_matches!(
            c.read_varint(Consume::Append),
            Err(DecodeError::UnexpectedEnd { offset: 1, needed: 2, remaining: 1 })
        );
        let mut c = ByteCursor::new(&[]);
        assert_matches!(c.take(1, Consume::Append), Err(DecodeError::UnexpectedEnd { .. }));
    }

    #[test]
    fn test_canonical_modes() {
        let data = [0x01, 0x02, 0x03, 0xfd, 0x00, 0x01, 0x04];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.take(1, Consume::Append).unwrap(), &[0x01]);
        assert_eq!(c.take_reversed(2, Consume::Skip).unwrap(), vec![0x03, 0x02]);
        assert_eq!(c.read_varint(Consume::SubNull).unwrap(), 256);
        c.take(1, Consume::Append).unwrap();
        assert_eq!(c.into_canonical(), vec![0x01, 0x00, 0x04]);
    }
}
