//! # gs-session
//!
//! Request-scoped sessions backed by a shared remote store.
//!
//! Many server processes share one [`gs_store::RemoteStore`]. For every
//! request, the [`SessionCoordinator`] looks the session up (or creates it),
//! hands a [`SessionHandle`] to the request handler and writes the result back
//! exactly once: an update if attributes changed, a removal if the session was
//! invalidated, or a plain lock release otherwise.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use gs_session::{SessionConfig, SessionCoordinator};
//! use gs_store::MemoryStore;
//!
//! let coordinator = SessionCoordinator::new(SessionConfig::new("shop"), Arc::new(MemoryStore::new()))?;
//!
//! let outcome = coordinator
//!     .handle(cookie.as_deref(), |session| async move {
//!         let visits = session.get_as::<u64>("visits")?.unwrap_or(0) + 1;
//!         session.set("visits", visits);
//!         Ok::<_, gs_session::SessionError>(visits)
//!     })
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod handle;
pub mod key;
pub mod record;

pub use config::SessionConfig;
pub use coordinator::{Reconciliation, SessionCoordinator, SessionOutcome};
pub use error::{HandleError, SessionError, SessionResult};
pub use handle::SessionHandle;
pub use key::{SessionKey, SessionKeyDeriver};
pub use record::{SessionRecord, WriteState};
