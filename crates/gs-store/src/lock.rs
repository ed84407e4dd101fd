//! Lock modes applied to reads and updates.

use serde::{Deserialize, Serialize};

/// Whether a read takes the per-key lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReadLockMode {
    /// Acquire the key's lock before reading and keep it on a hit.
    #[default]
    LockOnRead,
    /// Read without taking the lock.
    NoLockOnRead,
}

impl ReadLockMode {
    /// Returns `true` if a successful read holds the key's lock.
    #[must_use]
    pub const fn locks(self) -> bool {
        matches!(self, Self::LockOnRead)
    }
}

/// Whether an update discharges the per-key lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateLockMode {
    /// Release the key's lock once the write completes.
    #[default]
    UnlockAfterUpdate,
    /// Leave lock state untouched.
    None,
}

impl UpdateLockMode {
    /// Returns `true` if the update releases the key's lock.
    #[must_use]
    pub const fn unlocks(self) -> bool {
        matches!(self, Self::UnlockAfterUpdate)
    }
}

/// Paired read/update lock modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockingConfig {
    /// Lock mode used when a session is fetched.
    pub read: ReadLockMode,
    /// Lock mode used when a session is written back.
    pub update: UpdateLockMode,
}

impl LockingConfig {
    /// Lock on read, unlock after update.
    pub const LOCKING: Self = Self {
        read: ReadLockMode::LockOnRead,
        update: UpdateLockMode::UnlockAfterUpdate,
    };

    /// No locking on either side. Concurrent writers race, last write wins.
    pub const NON_LOCKING: Self = Self {
        read: ReadLockMode::NoLockOnRead,
        update: UpdateLockMode::None,
    };

    /// Selects the lock pair from the `session locking` switch.
    #[must_use]
    pub const fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Self::LOCKING
        } else {
            Self::NON_LOCKING
        }
    }

    /// Returns `true` if reads take the lock.
    #[must_use]
    pub const fn is_locking(&self) -> bool {
        self.read.locks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_selects_lock_on_read() {
        let config = LockingConfig::from_enabled(true);
        assert_eq!(config.read, ReadLockMode::LockOnRead);
        assert_eq!(config.update, UpdateLockMode::UnlockAfterUpdate);
        assert!(config.is_locking());
    }

    #[test]
    fn disabled_selects_no_locking() {
        let config = LockingConfig::from_enabled(false);
        assert_eq!(config.read, ReadLockMode::NoLockOnRead);
        assert_eq!(config.update, UpdateLockMode::None);
        assert!(!config.is_locking());
    }

    #[test]
    fn default_is_locking() {
        assert_eq!(LockingConfig::default(), LockingConfig::LOCKING);
    }
}
