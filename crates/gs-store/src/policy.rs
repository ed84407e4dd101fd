//! Default creation policy applied by the store to new records.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Expiry policy the store applies to records it creates or updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreatePolicy {
    /// Idle time after which the store may reclaim an untouched record.
    ///
    /// `None` means records never expire.
    pub timeout: Option<Duration>,
}

impl CreatePolicy {
    /// Creates a policy that expires records after `timeout` of inactivity.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    /// Creates a policy whose records never expire.
    #[must_use]
    pub const fn never_expires() -> Self {
        Self { timeout: None }
    }

    /// Builds a policy from a max-inactive-interval in seconds.
    ///
    /// Zero or negative intervals mean the session never times out.
    #[must_use]
    pub fn from_inactive_interval(seconds: i32) -> Self {
        match u64::try_from(seconds) {
            Ok(secs) if secs > 0 => Self::with_timeout(Duration::from_secs(secs)),
            _ => Self::never_expires(),
        }
    }
}
