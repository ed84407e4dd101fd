//! # gs-store
//!
//! Remote session store contract for gridsession.
//!
//! The session coordinator talks to the shared store only through the
//! [`RemoteStore`] trait. Adapters:
//!
//! - [`MemoryStore`] - in-process store honouring the full lock contract
//! - `gs-store-redis` - Redis-backed store shared by many processes
//!
//! ## Example
//!
//! ```ignore
//! use gs_store::{MemoryStore, ReadLockMode, RemoteStore, UpdateLockMode};
//!
//! async fn touch(store: &MemoryStore, key: &[u8]) -> gs_store::StoreResult<()> {
//!     if let Some(value) = store.get(key, ReadLockMode::LockOnRead).await? {
//!         store.update(key, &value, UpdateLockMode::UnlockAfterUpdate).await?;
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod lock;
pub mod memory;
pub mod policy;
pub mod provider;

pub use error::{StoreError, StoreResult};
pub use lock::{LockingConfig, ReadLockMode, UpdateLockMode};
pub use memory::{MemoryStore, StoreCalls, StoreOp};
pub use policy::CreatePolicy;
pub use provider::RemoteStore;
