//! Store error types.

use std::fmt;

/// Remote store operation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection to the store backend failed.
    Connection(String),
    /// Store operation or lock wait timed out.
    Timeout,
    /// Serialization/deserialization error.
    Serialization(String),
    /// Invalid store configuration.
    Configuration(String),
    /// Internal store error.
    Internal(String),
}

impl StoreError {
    /// Returns whether the store could not be reached at all.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "store connection error: {msg}"),
            Self::Timeout => write!(f, "store operation timed out"),
            Self::Serialization(msg) => write!(f, "store serialization error: {msg}"),
            Self::Configuration(msg) => write!(f, "store configuration error: {msg}"),
            Self::Internal(msg) => write!(f, "internal store error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
