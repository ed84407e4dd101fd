//! Cryptographically secure random generation for session identifiers.

use rand::distr::{Alphanumeric, SampleString};

/// Length of generated session identifiers.
pub const SESSION_ID_LEN: usize = 32;

/// Generates a cryptographically secure random string.
///
/// The string contains alphanumeric characters (a-z, A-Z, 0-9).
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    Alphanumeric.sample_string(&mut rng, len)
}

/// Generates a secure random session identifier.
///
/// Creates a 32-character alphanumeric identifier, roughly 190 bits of
/// entropy (log2(62^32)).
#[must_use]
pub fn generate_session_id() -> String {
    random_alphanumeric(SESSION_ID_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn random_alphanumeric_produces_correct_length() {
        assert_eq!(random_alphanumeric(16).len(), 16);
        assert_eq!(random_alphanumeric(64).len(), 64);
    }

    #[test]
    fn random_alphanumeric_only_contains_valid_chars() {
        let s = random_alphanumeric(1000);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generate_session_id_format() {
        let id = generate_session_id();
        assert_eq!(id.len(), SESSION_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generate_session_id_uniqueness() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_session_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
