// SPDX-License-Identifier: CC0-1.0

//! Hash helpers.

use sha2::{Digest, Sha256};

/// Double SHA-256.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// First `n` lower-case hex characters of the single SHA-256 of `data`.
pub fn make_chksum_n(data: &[u8], n: usize) -> String {
    let mut s = hex::encode(Sha256::digest(data));
    s.truncate(n);
    s
}

/// Six-character checksum used for transaction files and wallet transaction ids.
pub fn make_chksum_6(data: &[u8]) -> String {
    make_chksum_n(data, 6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chksum_6() {
        // sha256("") = e3b0c442...
        assert_eq!(make_chksum_6(b""), "e3b0c4");
        assert_eq!(make_chksum_n(b"", 8), "e3b0c442");
    }

    #[test]
    fn test_sha256d() {
        // sha256d("") = 5df6e0e2...
        assert_eq!(hex::encode(&sha256d(b"")[..4]), "5df6e0e2");
    }
}
