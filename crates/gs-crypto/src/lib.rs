//! # gs-crypto
//!
//! Cryptographic primitives for gridsession using aws-lc-rs.
//!
//! - [`hash`] - SHA-256 digests used to address session records in the store
//! - [`random`] - secure random generation for session identifiers

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod hash;
pub mod random;

pub use hash::{sha256, to_hex, verify_sha256, DigestError, SHA256_OUTPUT_LEN};
pub use random::generate_session_id;
