//! # gs-store-redis
//!
//! Redis implementation of the gridsession remote store, using the `fred`
//! crate and implementing [`gs_store::RemoteStore`].
//!
//! ## Features
//!
//! - Per-session locks (`SET NX PX`) with bounded waits
//! - Token-checked lock release
//! - Record expiry from the default create policy
//! - Key prefixing and per-application namespaces
//!
//! ## Example
//!
//! ```ignore
//! use gs_store::{ReadLockMode, RemoteStore};
//! use gs_store_redis::{RedisConfig, RedisStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RedisConfig::default().host("localhost").port(6379);
//!     let store = RedisStore::connect(config, "shop").await?;
//!
//!     let value = store.get(b"key", ReadLockMode::NoLockOnRead).await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod provider;

pub use config::RedisConfig;
pub use provider::RedisStore;
