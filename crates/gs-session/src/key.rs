//! Session key derivation.

use std::fmt;

use gs_crypto::{sha256, to_hex, SHA256_OUTPUT_LEN};

use crate::error::{SessionError, SessionResult};

/// Fixed-length store key derived from a session identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey([u8; SHA256_OUTPUT_LEN]);

impl SessionKey {
    /// Returns the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Renders the key as lowercase hexadecimal.
    #[must_use]
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }
}

impl AsRef<[u8]> for SessionKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey({})", self.to_hex())
    }
}

/// Maps session identifiers to store keys with SHA-256.
#[derive(Debug, Clone, Copy)]
pub struct SessionKeyDeriver {
    _verified: (),
}

impl SessionKeyDeriver {
    /// Creates a deriver after checking the digest primitive.
    ///
    /// ## Errors
    ///
    /// Returns [`SessionError::Configuration`] if SHA-256 fails its
    /// known-answer test; the store cannot be keyed safely without it.
    pub fn new() -> SessionResult<Self> {
        gs_crypto::verify_sha256().map_err(|e| SessionError::Configuration(e.to_string()))?;
        Ok(Self { _verified: () })
    }

    /// Derives the store key for `identifier`.
    #[must_use]
    pub fn derive(&self, identifier: &str) -> SessionKey {
        SessionKey(sha256(identifier.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let deriver = SessionKeyDeriver::new().unwrap();
        let a = deriver.derive("F3A9C1D2E4");
        let b = deriver.derive("F3A9C1D2E4");
        assert_eq!(a, b);
        assert_eq!(a.as_bytes().len(), 32);
    }

    #[test]
    fn no_collisions_in_corpus() {
        let deriver = SessionKeyDeriver::new().unwrap();
        let keys: HashSet<SessionKey> = (0..10_000)
            .map(|i| deriver.derive(&format!("session-{i}")))
            .collect();
        assert_eq!(keys.len(), 10_000);
    }

    #[test]
    fn empty_and_unicode_identifiers_derive() {
        let deriver = SessionKeyDeriver::new().unwrap();
        assert_eq!(
            deriver.derive("").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(deriver.derive("sessión"), deriver.derive("session"));
    }

    #[test]
    fn display_is_hex() {
        let deriver = SessionKeyDeriver::new().unwrap();
        let key = deriver.derive("abc");
        assert_eq!(key.to_string(), key.to_hex());
        assert!(key.to_string().starts_with("ba7816bf"));
    }
}
