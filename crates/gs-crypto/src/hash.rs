//! Hash functions for gridsession.
//!
//! Session keys are SHA-256 digests of the session identifier, so the
//! digest primitive is checked once at startup before any key is derived.

use aws_lc_rs::digest;
use thiserror::Error;

/// Length in bytes of a SHA-256 digest.
pub const SHA256_OUTPUT_LEN: usize = digest::SHA256_OUTPUT_LEN;

/// SHA-256("abc"), FIPS 180-2 appendix B.1.
const SHA256_ABC: [u8; SHA256_OUTPUT_LEN] = [
    0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d, 0xae, 0x22,
    0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10, 0xff, 0x61, 0xf2, 0x00,
    0x15, 0xad,
];

/// The digest primitive did not behave as expected.
#[derive(Debug, Error)]
#[error("SHA-256 self test failed: digest primitive unavailable or incorrect")]
pub struct DigestError;

/// Computes a SHA-256 digest of the input data.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; SHA256_OUTPUT_LEN] {
    let mut out = [0u8; SHA256_OUTPUT_LEN];
    out.copy_from_slice(digest::digest(&digest::SHA256, data).as_ref());
    out
}

/// Renders bytes as lowercase hexadecimal.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(DIGITS[usize::from(byte >> 4)]));
        out.push(char::from(DIGITS[usize::from(byte & 0x0f)]));
    }
    out
}

/// Runs a known-answer test against the SHA-256 implementation.
///
/// ## Errors
///
/// Returns [`DigestError`] when the computed digest does not match the
/// published test vector.
pub fn verify_sha256() -> Result<(), DigestError> {
    if sha256(b"abc") == SHA256_ABC {
        Ok(())
    } else {
        Err(DigestError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_produces_correct_length() {
        assert_eq!(sha256(b"test").len(), 32);
    }

    #[test]
    fn sha256_is_deterministic() {
        let a = sha256(b"hello world");
        let b = sha256(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn different_inputs_produce_different_hashes() {
        assert_ne!(sha256(b"hello"), sha256(b"world"));
    }

    #[test]
    fn self_test_passes() {
        assert!(verify_sha256().is_ok());
    }

    #[test]
    fn hex_rendering() {
        assert_eq!(to_hex(&[0x00, 0xab, 0x0f, 0xff]), "00ab0fff");
        assert!(to_hex(&sha256(b"abc")).starts_with("ba7816bf"));
    }

    #[test]
    fn empty_input_matches_known_digest() {
        let digest = sha256(b"");
        assert_eq!(&digest[..4], &[0xe3, 0xb0, 0xc4, 0x42]);
    }
}
