//! Per-request session lifecycle.
//!
//! [`SessionCoordinator::handle`] resolves the session for a request, lends a
//! [`SessionHandle`] to the downstream handler and then reconciles the
//! outcome with the store:
//!
//! | state after the handler | store calls                                   |
//! |-------------------------|-----------------------------------------------|
//! | invalidated             | `acquire_lock` (unless held), then `remove`   |
//! | dirty                   | `update` with the configured update lock mode |
//! | clean, lock held        | `release_lock`                                |
//! | clean, no lock          | none                                          |
//!
//! Reconciliation runs whether the handler returned, failed or panicked, so a
//! lock taken while reading the session is always discharged.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use gs_store::{CreatePolicy, LockingConfig, RemoteStore, StoreError};
use tokio::sync::OnceCell;

use crate::config::SessionConfig;
use crate::error::{HandleError, SessionError, SessionResult};
use crate::handle::SessionHandle;
use crate::key::{SessionKey, SessionKeyDeriver};
use crate::record::{SessionRecord, WriteState};

/// Store action taken when a request finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Nothing changed and no lock was held.
    Untouched,
    /// Nothing changed; the read lock was released.
    Released,
    /// The session was written back.
    Updated,
    /// The session was deleted.
    Removed,
}

/// Result of a successfully coordinated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome<T> {
    /// Identifier of the session the request ran against.
    pub session_id: String,
    /// Whether the session was created for this request.
    pub is_new: bool,
    /// Store action taken after the handler returned.
    pub reconciliation: Reconciliation,
    /// Value returned by the handler.
    pub value: T,
}

struct Resolved {
    record: SessionRecord,
    key: SessionKey,
    lock_held: bool,
}

/// Synchronizes request-scoped sessions with a shared [`RemoteStore`].
///
/// Holds no per-session state; concurrent requests for the same session are
/// serialized by the store's lock when locking is enabled.
pub struct SessionCoordinator {
    store: Arc<dyn RemoteStore>,
    keys: SessionKeyDeriver,
    config: SessionConfig,
    locking: LockingConfig,
    create_policy: OnceCell<()>,
}

impl SessionCoordinator {
    /// Creates a coordinator over `store`.
    ///
    /// ## Errors
    ///
    /// Returns [`SessionError::Configuration`] if the configuration is invalid
    /// or the key digest is unusable.
    pub fn new(config: SessionConfig, store: Arc<dyn RemoteStore>) -> SessionResult<Self> {
        config.validate()?;
        let keys = SessionKeyDeriver::new()?;
        let locking = config.locking();

        tracing::info!(
            cache_name = %config.cache_name,
            locking = locking.is_locking(),
            "session coordinator initialized"
        );

        Ok(Self {
            store,
            keys,
            config,
            locking,
            create_policy: OnceCell::new(),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the store key for a session identifier.
    #[must_use]
    pub fn key_for(&self, identifier: &str) -> SessionKey {
        self.keys.derive(identifier)
    }

    /// Installs the store's default create policy, once.
    ///
    /// Only the first call per coordinator reaches the store; later intervals
    /// are ignored even if they differ. Concurrent callers wait until the
    /// policy is installed. Returns `true` if this call installed the policy.
    ///
    /// ## Errors
    ///
    /// Returns a store error if the policy could not be set; the next call
    /// will try again.
    pub async fn configure_create_policy(&self, max_inactive_interval: i32) -> SessionResult<bool> {
        let installed = AtomicBool::new(false);
        let flag = &installed;
        let store = &self.store;

        self.create_policy
            .get_or_try_init(move || async move {
                let policy = CreatePolicy::from_inactive_interval(max_inactive_interval);
                store.set_default_create_policy(policy).await?;
                flag.store(true, Ordering::Release);
                Ok::<_, StoreError>(())
            })
            .await?;

        let installed = installed.load(Ordering::Acquire);
        if installed {
            tracing::debug!(max_inactive_interval, "default create policy configured");
        }
        Ok(installed)
    }

    /// Runs `downstream` against the session named by `identifier`.
    ///
    /// An absent or unknown identifier starts a new session. The handler is
    /// called exactly once; afterwards the session is updated, removed or
    /// unlocked in the store according to what the handler did.
    ///
    /// ## Errors
    ///
    /// - [`HandleError::Session`] if the lookup or creation failed (the
    ///   handler did not run), or the handler succeeded but reconciliation
    ///   failed.
    /// - [`HandleError::Downstream`] if the handler failed, together with any
    ///   reconciliation failure.
    ///
    /// ## Panics
    ///
    /// A panic in `downstream` is resumed after reconciliation.
    pub async fn handle<F, Fut, T, E>(
        &self,
        identifier: Option<&str>,
        downstream: F,
    ) -> Result<SessionOutcome<T>, HandleError<E>>
    where
        F: FnOnce(SessionHandle) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Resolved {
            mut record,
            key,
            lock_held,
        } = self.resolve(identifier).await?;

        record.begin_request();
        let session_id = record.id().to_string();
        let is_new = record.is_new();
        let handle = SessionHandle::new(record);

        let session = handle.clone();
        let result = AssertUnwindSafe(async move { downstream(session).await })
            .catch_unwind()
            .await;

        let reconciled = self.reconcile(&key, &handle, lock_held).await;

        match result {
            Ok(Ok(value)) => Ok(SessionOutcome {
                session_id,
                is_new,
                reconciliation: reconciled?,
                value,
            }),
            Ok(Err(error)) => Err(HandleError::Downstream {
                error,
                reconcile: reconciled.err(),
            }),
            Err(panic) => {
                if let Err(err) = reconciled {
                    tracing::warn!(session_key = %key, error = %err, "reconciliation failed after handler panic");
                }
                std::panic::resume_unwind(panic)
            }
        }
    }

    async fn resolve(&self, identifier: Option<&str>) -> SessionResult<Resolved> {
        if let Some(id) = identifier {
            let key = self.keys.derive(id);
            if let Some(bytes) = self.store.get(key.as_bytes(), self.locking.read).await? {
                let lock_held = self.locking.read.locks();
                let mut record = match SessionRecord::from_bytes(&bytes) {
                    Ok(record) => record,
                    Err(err) => {
                        if lock_held {
                            self.discharge(&key).await;
                        }
                        return Err(err);
                    }
                };

                // Another request created it first; this one is the second observer.
                if record.is_new() {
                    record.demote();
                }

                tracing::debug!(session_key = %key, lock_held, "resolved existing session");
                return Ok(Resolved {
                    record,
                    key,
                    lock_held,
                });
            }
            tracing::debug!(session_key = %key, "requested session not found");
        }

        self.create().await
    }

    async fn create(&self) -> SessionResult<Resolved> {
        let record = SessionRecord::new(
            gs_crypto::generate_session_id(),
            self.config.default_max_inactive_interval,
        );
        self.configure_create_policy(record.max_inactive_interval())
            .await?;

        let key = self.keys.derive(record.id());
        self.store.put(key.as_bytes(), &record.to_bytes()?).await?;

        tracing::debug!(session_key = %key, "created session");
        Ok(Resolved {
            record,
            key,
            lock_held: false,
        })
    }

    async fn reconcile(
        &self,
        key: &SessionKey,
        handle: &SessionHandle,
        lock_held: bool,
    ) -> SessionResult<Reconciliation> {
        let record = handle.snapshot();
        let action = match record.write_state() {
            WriteState::Invalidated => {
                if !lock_held {
                    self.store.acquire_lock(key.as_bytes()).await?;
                }
                if let Err(err) = self.store.remove(key.as_bytes()).await {
                    self.discharge(key).await;
                    return Err(err.into());
                }
                Reconciliation::Removed
            }
            WriteState::Dirty => {
                let written = match record.to_bytes() {
                    Ok(bytes) => self
                        .store
                        .update(key.as_bytes(), &bytes, self.locking.update)
                        .await
                        .map_err(SessionError::from),
                    Err(err) => Err(err),
                };
                if let Err(err) = written {
                    if lock_held {
                        self.discharge(key).await;
                    }
                    return Err(err);
                }
                Reconciliation::Updated
            }
            WriteState::Clean if lock_held => {
                self.store.release_lock(key.as_bytes()).await?;
                Reconciliation::Released
            }
            WriteState::Clean => Reconciliation::Untouched,
        };

        tracing::debug!(session_key = %key, ?action, "session reconciled");
        Ok(action)
    }

    /// Best-effort lock release on a failure path.
    async fn discharge(&self, key: &SessionKey) {
        if let Err(err) = self.store.release_lock(key.as_bytes()).await {
            tracing::warn!(session_key = %key, error = %err, "failed to release session lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use gs_store::MemoryStore;

    use super::*;

    #[test]
    fn empty_cache_name_is_rejected() {
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
        let err = SessionCoordinator::new(SessionConfig::new(""), store)
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn create_policy_is_configured_once() {
        let store = Arc::new(MemoryStore::new());
        let coordinator =
            SessionCoordinator::new(SessionConfig::new("shop"), store.clone()).unwrap();

        assert!(coordinator.configure_create_policy(600).await.unwrap());
        assert!(!coordinator.configure_create_policy(60).await.unwrap());

        assert_eq!(store.calls().set_default_create_policy, 1);
        assert_eq!(
            store.default_create_policy(),
            Some(CreatePolicy::from_inactive_interval(600))
        );
    }

    #[tokio::test]
    async fn failed_policy_setup_is_retried() {
        let store = Arc::new(MemoryStore::new());
        let coordinator =
            SessionCoordinator::new(SessionConfig::new("shop"), store.clone()).unwrap();

        store.fail_next(gs_store::StoreOp::SetDefaultCreatePolicy);
        assert!(coordinator.configure_create_policy(600).await.is_err());
        assert!(coordinator.configure_create_policy(600).await.unwrap());
    }

    /// Delegates to a [`MemoryStore`], but installing the policy takes a while.
    struct SlowPolicyStore {
        inner: MemoryStore,
        puts_without_policy: std::sync::atomic::AtomicUsize,
    }

    impl SlowPolicyStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                puts_without_policy: std::sync::atomic::AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl RemoteStore for SlowPolicyStore {
        async fn get(
            &self,
            key: &[u8],
            mode: gs_store::ReadLockMode,
        ) -> gs_store::StoreResult<Option<Vec<u8>>> {
            self.inner.get(key, mode).await
        }

        async fn put(&self, key: &[u8], value: &[u8]) -> gs_store::StoreResult<()> {
            if self.inner.default_create_policy().is_none() {
                self.puts_without_policy.fetch_add(1, Ordering::SeqCst);
            }
            self.inner.put(key, value).await
        }

        async fn update(
            &self,
            key: &[u8],
            value: &[u8],
            mode: gs_store::UpdateLockMode,
        ) -> gs_store::StoreResult<()> {
            self.inner.update(key, value, mode).await
        }

        async fn acquire_lock(&self, key: &[u8]) -> gs_store::StoreResult<()> {
            self.inner.acquire_lock(key).await
        }

        async fn release_lock(&self, key: &[u8]) -> gs_store::StoreResult<()> {
            self.inner.release_lock(key).await
        }

        async fn remove(&self, key: &[u8]) -> gs_store::StoreResult<()> {
            self.inner.remove(key).await
        }

        async fn set_default_create_policy(&self, policy: CreatePolicy) -> gs_store::StoreResult<()> {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.inner.set_default_create_policy(policy).await
        }
    }

    #[tokio::test]
    async fn concurrent_creators_wait_for_policy() {
        let store = Arc::new(SlowPolicyStore::new());
        let coordinator =
            SessionCoordinator::new(SessionConfig::new("shop"), store.clone()).unwrap();

        let configure = || async {
            let installed = coordinator.configure_create_policy(600).await.unwrap();
            (installed, store.inner.default_create_policy().is_some())
        };
        let ((first, first_sees), (second, second_sees)) = tokio::join!(configure(), configure());

        assert!(first ^ second);
        assert!(first_sees && second_sees);
        assert_eq!(store.inner.calls().set_default_create_policy, 1);
    }

    #[tokio::test]
    async fn first_session_is_stored_after_policy() {
        let store = Arc::new(SlowPolicyStore::new());
        let coordinator =
            SessionCoordinator::new(SessionConfig::new("shop"), store.clone()).unwrap();

        let noop = |_| async { Ok::<_, std::convert::Infallible>(()) };
        let (a, b) = tokio::join!(coordinator.handle(None, noop), coordinator.handle(None, noop));
        a.unwrap();
        b.unwrap();

        assert_eq!(store.inner.calls().put, 2);
        assert_eq!(store.puts_without_policy.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn key_for_matches_deriver() {
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
        let coordinator = SessionCoordinator::new(SessionConfig::new("shop"), store).unwrap();
        let deriver = SessionKeyDeriver::new().unwrap();
        assert_eq!(coordinator.key_for("abc"), deriver.derive("abc"));
    }
}
