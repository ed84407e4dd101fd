//! Redis store error conversion.

use gs_store::StoreError;

/// Converts a `fred` Redis error to a `StoreError`.
#[allow(clippy::needless_pass_by_value)]
pub fn from_redis_error(err: fred::error::Error) -> StoreError {
    match err.kind() {
        fred::error::ErrorKind::Timeout => StoreError::Timeout,
        fred::error::ErrorKind::IO => StoreError::Connection(err.to_string()),
        fred::error::ErrorKind::Config => StoreError::Configuration(err.to_string()),
        _ => StoreError::Internal(err.to_string()),
    }
}
