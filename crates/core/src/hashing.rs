//! Shared SHA-256 hex digest utility.
//!
//! Used to derive strong `ETag` values for rendered QR artifacts.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_produces_known_hash() {
        let hash = sha256_hex(b"");
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn identical_artifacts_share_a_digest() {
        let png = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
        assert_eq!(sha256_hex(&png), sha256_hex(&png));
        assert_eq!(sha256_hex(&png).len(), 64);
        assert_ne!(sha256_hex(&png), sha256_hex(&png[..4]));
    }
}
