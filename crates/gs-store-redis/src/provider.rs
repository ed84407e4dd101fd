//! Redis store implementation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Instant;

use async_trait::async_trait;
use fred::cmd;
use fred::prelude::*;
use gs_crypto::random::random_alphanumeric;
use gs_crypto::to_hex;
use gs_store::{
    CreatePolicy, ReadLockMode, RemoteStore, StoreError, StoreResult, UpdateLockMode,
};

use crate::config::RedisConfig;
use crate::error::from_redis_error;

/// Deletes the lock only if this process still owns it.
const RELEASE_SCRIPT: &str = "if redis.call('GET', KEYS[1]) == ARGV[1] then \
                              return redis.call('DEL', KEYS[1]) else return 0 end";

/// Length of the random token identifying one lock acquisition.
const LOCK_TOKEN_LEN: usize = 24;

/// Safely convert a duration in seconds or millis to i64 for Redis expiration.
#[allow(clippy::cast_possible_wrap)]
const fn to_i64(value: u64) -> i64 {
    value as i64
}

/// Redis-backed session store.
///
/// Records live under `{prefix}:{namespace}:{hex key}` and their locks under
/// the same key with a `:lock` suffix. A lock is a `SET NX PX` entry holding a
/// token drawn for that acquisition, so a lock that outlives its owner expires
/// after `lock_timeout_ms` and a late release never deletes a newer lock.
///
/// Tokens of locks taken through this store are kept until released; while
/// one is held, other callers in this process wait for it like any other
/// holder.
pub struct RedisStore {
    client: Client,
    config: RedisConfig,
    namespace: String,
    tokens: parking_lot::Mutex<HashMap<String, String>>,
    policy: OnceLock<CreatePolicy>,
}

impl RedisStore {
    /// Connects to Redis and creates a store for the `namespace` application.
    ///
    /// ## Errors
    ///
    /// Returns an error if `namespace` is empty or the connection cannot be
    /// established.
    pub async fn connect(config: RedisConfig, namespace: impl Into<String>) -> StoreResult<Self> {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return Err(StoreError::Configuration(
                "store namespace must not be empty".to_string(),
            ));
        }

        let redis_config = Config::from_url(&config.connection_url())
            .map_err(|e| StoreError::Configuration(e.to_string()))?;

        let client = Client::new(
            redis_config,
            None,
            None,
            Some(ReconnectPolicy::new_exponential(0, 1000, 30_000, 2)),
        );

        tokio::time::timeout(config.connect_timeout(), client.init())
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(from_redis_error)?;

        tracing::info!(namespace = %namespace, "connected to redis session store");

        Ok(Self::with_client(client, config, namespace))
    }

    /// Creates a store over an already initialized client.
    #[must_use]
    pub fn with_client(client: Client, config: RedisConfig, namespace: impl Into<String>) -> Self {
        Self {
            client,
            config,
            namespace: namespace.into(),
            tokens: parking_lot::Mutex::new(HashMap::new()),
            policy: OnceLock::new(),
        }
    }

    /// Returns the underlying Redis client.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// Returns the Redis key holding the record for `key`.
    #[must_use]
    pub fn record_key(&self, key: &[u8]) -> String {
        self.config
            .prefixed_key(&format!("{}:{}", self.namespace, to_hex(key)))
    }

    /// Returns the Redis key holding the lock for `key`.
    #[must_use]
    pub fn lock_key(&self, key: &[u8]) -> String {
        format!("{}:lock", self.record_key(key))
    }

    fn expiration(&self) -> Option<Expiration> {
        self.policy
            .get()
            .and_then(|p| p.timeout)
            .map(|timeout| Expiration::EX(to_i64(timeout.as_secs().max(1))))
    }

    /// Bounds a command by the configured command timeout.
    async fn timed<T, F>(&self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, fred::error::Error>>,
    {
        tokio::time::timeout(self.config.command_timeout(), fut)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(from_redis_error)
    }

    async fn write(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let record_key = self.record_key(key);
        self.timed(self.client.set::<(), _, _>(
            &record_key,
            value.to_vec(),
            self.expiration(),
            None,
            false,
        ))
        .await
    }

    fn holds(&self, lock_key: &str) -> bool {
        self.tokens.lock().contains_key(lock_key)
    }

    fn remember(&self, lock_key: String, token: String) {
        self.tokens.lock().insert(lock_key, token);
    }

    fn forget(&self, lock_key: &str) -> Option<String> {
        self.tokens.lock().remove(lock_key)
    }

    async fn try_lock(&self, lock_key: &str, token: &str) -> StoreResult<bool> {
        let result: Option<String> = self
            .timed(self.client.set(
                lock_key,
                token,
                Some(Expiration::PX(to_i64(self.config.lock_timeout_ms))),
                Some(SetOptions::NX),
                false,
            ))
            .await?;
        Ok(result.is_some())
    }

    async fn lock(&self, key: &[u8]) -> StoreResult<()> {
        let lock_key = self.lock_key(key);
        let started = Instant::now();

        loop {
            if !self.holds(&lock_key) {
                let token = random_alphanumeric(LOCK_TOKEN_LEN);
                if self.try_lock(&lock_key, &token).await? {
                    self.remember(lock_key, token);
                    return Ok(());
                }
            }
            if started.elapsed() >= self.config.lock_wait() {
                tracing::warn!(lock = %lock_key, "gave up waiting for session lock");
                return Err(StoreError::Timeout);
            }
            tokio::time::sleep(self.config.lock_retry()).await;
        }
    }

    async fn unlock(&self, key: &[u8]) -> StoreResult<()> {
        let lock_key = self.lock_key(key);
        let Some(token) = self.forget(&lock_key) else {
            return Ok(());
        };
        let args = vec![RELEASE_SCRIPT.to_string(), "1".to_string(), lock_key, token];
        self.timed(self.client.custom::<(), _>(cmd!("EVAL"), args))
            .await
    }

    async fn read(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let record_key = self.record_key(key);
        self.timed(self.client.get::<Option<Vec<u8>>, _>(&record_key))
            .await
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn get(&self, key: &[u8], mode: ReadLockMode) -> StoreResult<Option<Vec<u8>>> {
        if !mode.locks() {
            return self.read(key).await;
        }

        self.lock(key).await?;
        match self.read(key).await {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => {
                self.unlock(key).await?;
                Ok(None)
            }
            Err(err) => {
                if let Err(unlock_err) = self.unlock(key).await {
                    tracing::warn!(error = %unlock_err, "failed to release lock after read error");
                }
                Err(err)
            }
        }
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.write(key, value).await
    }

    async fn update(&self, key: &[u8], value: &[u8], mode: UpdateLockMode) -> StoreResult<()> {
        let written = self.write(key, value).await;
        if mode.unlocks() {
            let released = self.unlock(key).await;
            written?;
            released
        } else {
            written
        }
    }

    async fn acquire_lock(&self, key: &[u8]) -> StoreResult<()> {
        self.lock(key).await
    }

    async fn release_lock(&self, key: &[u8]) -> StoreResult<()> {
        self.unlock(key).await
    }

    async fn remove(&self, key: &[u8]) -> StoreResult<()> {
        let record_key = self.record_key(key);
        let deleted = self.timed(self.client.del::<(), _>(&record_key)).await;
        let released = self.unlock(key).await;
        deleted?;
        released
    }

    async fn set_default_create_policy(&self, policy: CreatePolicy) -> StoreResult<()> {
        if self.policy.set(policy).is_err() {
            tracing::debug!("default create policy already set, ignoring");
        }
        Ok(())
    }
}
