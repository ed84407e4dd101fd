//! Remote store trait.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::lock::{ReadLockMode, UpdateLockMode};
use crate::policy::CreatePolicy;

/// Keyed store shared by every process serving the same sessions.
///
/// Keys are opaque byte strings (the derived session key); values are
/// serialized session records. Implementations must be thread-safe and
/// every operation may block on a network round trip.
///
/// ## Lock contract
///
/// A `get` with [`ReadLockMode::LockOnRead`] that returns `Some` leaves the
/// key locked until one of [`update`](Self::update) with
/// [`UpdateLockMode::UnlockAfterUpdate`], [`release_lock`](Self::release_lock)
/// or [`remove`](Self::remove) runs for that key. A `get` that fails or misses
/// holds no lock.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Reads the value stored under `key`.
    async fn get(&self, key: &[u8], mode: ReadLockMode) -> StoreResult<Option<Vec<u8>>>;

    /// Inserts `value` under `key` unconditionally, without locking.
    async fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Overwrites the value under `key`.
    ///
    /// Discharges the key's lock when `mode` is [`UpdateLockMode::UnlockAfterUpdate`].
    async fn update(&self, key: &[u8], value: &[u8], mode: UpdateLockMode) -> StoreResult<()>;

    /// Blocks until the key's lock is held by the caller.
    async fn acquire_lock(&self, key: &[u8]) -> StoreResult<()>;

    /// Releases the key's lock. Releasing an unlocked key is not an error.
    async fn release_lock(&self, key: &[u8]) -> StoreResult<()>;

    /// Deletes the value under `key` and discharges its lock.
    async fn remove(&self, key: &[u8]) -> StoreResult<()>;

    /// Sets the expiry policy for records created from now on.
    ///
    /// Intended to be called once per process; implementations treat repeat
    /// calls as no-ops.
    async fn set_default_create_policy(&self, policy: CreatePolicy) -> StoreResult<()>;
}
