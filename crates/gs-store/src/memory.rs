//! In-process store.
//!
//! Implements the full [`RemoteStore`] lock contract inside one process. Used
//! for single-node deployments and as the store behind the coordinator tests;
//! it keeps per-operation call counters and can inject failures.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::{StoreError, StoreResult};
use crate::lock::{ReadLockMode, UpdateLockMode};
use crate::policy::CreatePolicy;
use crate::provider::RemoteStore;

/// Upper bound between two sweeps of expired records.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Store operations, used for call counting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// [`RemoteStore::get`].
    Get,
    /// [`RemoteStore::put`].
    Put,
    /// [`RemoteStore::update`].
    Update,
    /// [`RemoteStore::acquire_lock`].
    AcquireLock,
    /// [`RemoteStore::release_lock`].
    ReleaseLock,
    /// [`RemoteStore::remove`].
    Remove,
    /// [`RemoteStore::set_default_create_policy`].
    SetDefaultCreatePolicy,
}

impl StoreOp {
    const ALL: [Self; 7] = [
        Self::Get,
        Self::Put,
        Self::Update,
        Self::AcquireLock,
        Self::ReleaseLock,
        Self::Remove,
        Self::SetDefaultCreatePolicy,
    ];

    const fn index(self) -> usize {
        self as usize
    }
}

/// Snapshot of how many times each operation was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreCalls {
    /// `get` calls.
    pub get: usize,
    /// `put` calls.
    pub put: usize,
    /// `update` calls.
    pub update: usize,
    /// `acquire_lock` calls.
    pub acquire_lock: usize,
    /// `release_lock` calls.
    pub release_lock: usize,
    /// `remove` calls.
    pub remove: usize,
    /// `set_default_create_policy` calls.
    pub set_default_create_policy: usize,
}

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct State {
    records: HashMap<Vec<u8>, Entry>,
    locked: HashSet<Vec<u8>>,
    faults: Vec<StoreOp>,
    next_sweep: Option<Instant>,
}

impl State {
    /// Drops expired records, at most once per `interval`.
    fn sweep(&mut self, now: Instant, interval: Duration) {
        if self.next_sweep.is_some_and(|at| at > now) {
            return;
        }
        let before = self.records.len();
        self.records.retain(|_, entry| !expired_at(entry, now));
        self.next_sweep = Some(now + interval.min(MAX_SWEEP_INTERVAL));

        let swept = before - self.records.len();
        if swept > 0 {
            tracing::debug!(swept, "reclaimed expired session records");
        }
    }
}

/// In-memory [`RemoteStore`].
pub struct MemoryStore {
    state: Mutex<State>,
    released: Notify,
    policy: OnceLock<CreatePolicy>,
    lock_wait: Option<Duration>,
    calls: [AtomicUsize; 7],
}

impl MemoryStore {
    /// Creates an empty store whose lock waits never time out.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            released: Notify::new(),
            policy: OnceLock::new(),
            lock_wait: None,
            calls: Default::default(),
        }
    }

    /// Fails lock acquisition with [`StoreError::Timeout`] after `wait`.
    #[must_use]
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = Some(wait);
        self
    }

    /// Makes the next call of `op` fail with a connection error.
    pub fn fail_next(&self, op: StoreOp) {
        self.state.lock().faults.push(op);
    }

    /// Returns how many times each operation has been called.
    #[must_use]
    pub fn calls(&self) -> StoreCalls {
        let count = |op: StoreOp| self.calls[op.index()].load(Ordering::SeqCst);
        StoreCalls {
            get: count(StoreOp::Get),
            put: count(StoreOp::Put),
            update: count(StoreOp::Update),
            acquire_lock: count(StoreOp::AcquireLock),
            release_lock: count(StoreOp::ReleaseLock),
            remove: count(StoreOp::Remove),
            set_default_create_policy: count(StoreOp::SetDefaultCreatePolicy),
        }
    }

    /// Resets all call counters to zero.
    pub fn reset_calls(&self) {
        for op in StoreOp::ALL {
            self.calls[op.index()].store(0, Ordering::SeqCst);
        }
    }

    /// Returns the raw value under `key` without touching locks or counters.
    ///
    /// An expired record found here is dropped.
    #[must_use]
    pub fn peek(&self, key: &[u8]) -> Option<Vec<u8>> {
        let mut state = self.state.lock();
        if is_expired(state.records.get(key)?) {
            state.records.remove(key);
            return None;
        }
        state.records.get(key).map(|entry| entry.value.clone())
    }

    /// Returns `true` if `key` is currently locked.
    #[must_use]
    pub fn is_locked(&self, key: &[u8]) -> bool {
        self.state.lock().locked.contains(key)
    }

    /// Returns `true` if any key is currently locked.
    #[must_use]
    pub fn has_locks(&self) -> bool {
        !self.state.lock().locked.is_empty()
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.records.values().filter(|e| !is_expired(e)).count()
    }

    /// Number of records held, including expired ones not yet reclaimed.
    #[must_use]
    pub fn stored_entries(&self) -> usize {
        self.state.lock().records.len()
    }

    /// Returns `true` if the store holds no live records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the policy installed by the first `set_default_create_policy` call.
    #[must_use]
    pub fn default_create_policy(&self) -> Option<CreatePolicy> {
        self.policy.get().copied()
    }

    fn begin(&self, op: StoreOp) -> StoreResult<()> {
        self.calls[op.index()].fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if let Some(pos) = state.faults.iter().position(|f| *f == op) {
            state.faults.remove(pos);
            return Err(StoreError::Connection(format!("injected {op:?} failure")));
        }
        Ok(())
    }

    fn write(&self, key: &[u8], value: &[u8]) {
        let now = Instant::now();
        let timeout = self.policy.get().and_then(|p| p.timeout);

        let mut state = self.state.lock();
        if let Some(timeout) = timeout {
            state.sweep(now, timeout);
        }
        state.records.insert(
            key.to_vec(),
            Entry {
                value: value.to_vec(),
                expires_at: timeout.map(|timeout| now + timeout),
            },
        );
    }

    fn unlock(&self, key: &[u8]) {
        let was_locked = self.state.lock().locked.remove(key);
        if was_locked {
            self.released.notify_waiters();
        }
    }

    async fn lock(&self, key: &[u8]) -> StoreResult<()> {
        let wait = async {
            loop {
                let notified = self.released.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if self.state.lock().locked.insert(key.to_vec()) {
                    return;
                }
                notified.await;
            }
        };

        match self.lock_wait {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| StoreError::Timeout),
            None => {
                wait.await;
                Ok(())
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn is_expired(entry: &Entry) -> bool {
    expired_at(entry, Instant::now())
}

fn expired_at(entry: &Entry, now: Instant) -> bool {
    entry.expires_at.is_some_and(|at| at <= now)
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &[u8], mode: ReadLockMode) -> StoreResult<Option<Vec<u8>>> {
        self.begin(StoreOp::Get)?;
        if mode.locks() {
            self.lock(key).await?;
        }

        let value = self.peek(key);
        if value.is_none() && mode.locks() {
            self.unlock(key);
        }
        Ok(value)
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.begin(StoreOp::Put)?;
        self.write(key, value);
        Ok(())
    }

    async fn update(&self, key: &[u8], value: &[u8], mode: UpdateLockMode) -> StoreResult<()> {
        self.begin(StoreOp::Update)?;
        self.write(key, value);
        if mode.unlocks() {
            self.unlock(key);
        }
        Ok(())
    }

    async fn acquire_lock(&self, key: &[u8]) -> StoreResult<()> {
        self.begin(StoreOp::AcquireLock)?;
        self.lock(key).await
    }

    async fn release_lock(&self, key: &[u8]) -> StoreResult<()> {
        self.begin(StoreOp::ReleaseLock)?;
        self.unlock(key);
        Ok(())
    }

    async fn remove(&self, key: &[u8]) -> StoreResult<()> {
        self.begin(StoreOp::Remove)?;
        self.state.lock().records.remove(key);
        self.unlock(key);
        Ok(())
    }

    async fn set_default_create_policy(&self, policy: CreatePolicy) -> StoreResult<()> {
        self.begin(StoreOp::SetDefaultCreatePolicy)?;
        if self.policy.set(policy).is_err() {
            tracing::debug!("default create policy already set, ignoring");
        }
        Ok(())
    }
}
