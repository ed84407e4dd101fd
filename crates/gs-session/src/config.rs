//! Session coordinator configuration.
//!
//! Loaded from environment variables, with a `.env` file honoured when present.

use gs_store::LockingConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

/// Environment variable naming the store namespace.
pub const CACHE_NAME_VAR: &str = "GS_CACHE_NAME";

/// Environment variable switching session locking.
pub const SESSION_LOCKING_VAR: &str = "GS_SESSION_LOCKING";

/// Environment variable holding the default max inactive interval in seconds.
pub const MAX_INACTIVE_INTERVAL_VAR: &str = "GS_MAX_INACTIVE_INTERVAL";

/// Default max inactive interval for new sessions (30 minutes).
pub const DEFAULT_MAX_INACTIVE_INTERVAL: i32 = 1800;

/// Session coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Namespace of the backing store. Required.
    pub cache_name: String,

    /// Lock sessions on read and unlock after update.
    #[serde(default = "default_locking")]
    pub session_locking_enabled: bool,

    /// Max inactive interval, in seconds, given to new sessions.
    #[serde(default = "default_interval")]
    pub default_max_inactive_interval: i32,
}

impl SessionConfig {
    /// Creates a configuration for the `cache_name` namespace with defaults.
    #[must_use]
    pub fn new(cache_name: impl Into<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            session_locking_enabled: default_locking(),
            default_max_inactive_interval: default_interval(),
        }
    }

    /// Enables or disables session locking.
    #[must_use]
    pub const fn session_locking(mut self, enabled: bool) -> Self {
        self.session_locking_enabled = enabled;
        self
    }

    /// Sets the max inactive interval for new sessions.
    #[must_use]
    pub const fn default_max_inactive_interval(mut self, seconds: i32) -> Self {
        self.default_max_inactive_interval = seconds;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// ## Errors
    ///
    /// Returns [`SessionError::Configuration`] if `GS_CACHE_NAME` is missing
    /// or empty, or `GS_MAX_INACTIVE_INTERVAL` is not an integer.
    pub fn from_env() -> SessionResult<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// ## Errors
    ///
    /// Same as [`SessionConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> SessionResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache_name = lookup(CACHE_NAME_VAR).ok_or_else(|| {
            SessionError::Configuration(format!("{CACHE_NAME_VAR} environment variable is required"))
        })?;

        // Anything other than an explicit "false" keeps locking on.
        let session_locking_enabled = lookup(SESSION_LOCKING_VAR)
            .map_or(true, |v| !v.trim().eq_ignore_ascii_case("false"));

        let default_max_inactive_interval = match lookup(MAX_INACTIVE_INTERVAL_VAR) {
            Some(v) => v.trim().parse().map_err(|_| {
                SessionError::Configuration(format!(
                    "{MAX_INACTIVE_INTERVAL_VAR} must be an integer, got {v:?}"
                ))
            })?,
            None => DEFAULT_MAX_INACTIVE_INTERVAL,
        };

        let config = Self {
            cache_name,
            session_locking_enabled,
            default_max_inactive_interval,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration can be used to serve requests.
    ///
    /// ## Errors
    ///
    /// Returns [`SessionError::Configuration`] if the cache name is empty.
    pub fn validate(&self) -> SessionResult<()> {
        if self.cache_name.trim().is_empty() {
            return Err(SessionError::Configuration(format!(
                "cache name is empty, set {CACHE_NAME_VAR}"
            )));
        }
        Ok(())
    }

    /// Read/update lock modes selected by `session_locking_enabled`.
    #[must_use]
    pub const fn locking(&self) -> LockingConfig {
        LockingConfig::from_enabled(self.session_locking_enabled)
    }
}

const fn default_locking() -> bool {
    true
}

const fn default_interval() -> i32 {
    DEFAULT_MAX_INACTIVE_INTERVAL
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use gs_store::{ReadLockMode, UpdateLockMode};

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn locking_defaults_to_enabled() {
        let config = SessionConfig::from_lookup(lookup(&[(CACHE_NAME_VAR, "shop")])).unwrap();
        assert_eq!(config.cache_name, "shop");
        assert!(config.session_locking_enabled);
        assert_eq!(config.locking().read, ReadLockMode::LockOnRead);
        assert_eq!(config.default_max_inactive_interval, 1800);
    }

    #[test]
    fn explicit_false_disables_locking() {
        let config = SessionConfig::from_lookup(lookup(&[
            (CACHE_NAME_VAR, "shop"),
            (SESSION_LOCKING_VAR, "false"),
        ]))
        .unwrap();
        assert!(!config.session_locking_enabled);
        assert_eq!(config.locking().update, UpdateLockMode::None);
    }

    #[test]
    fn other_locking_values_keep_locking() {
        let config = SessionConfig::from_lookup(lookup(&[
            (CACHE_NAME_VAR, "shop"),
            (SESSION_LOCKING_VAR, "no"),
        ]))
        .unwrap();
        assert!(config.session_locking_enabled);
    }

    #[test]
    fn missing_cache_name_is_fatal() {
        let err = SessionConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn empty_cache_name_is_fatal() {
        let err = SessionConfig::from_lookup(lookup(&[(CACHE_NAME_VAR, "")])).unwrap_err();
        assert!(err.is_configuration());
        assert!(SessionConfig::new("  ").validate().is_err());
    }

    #[test]
    fn interval_must_be_numeric() {
        let err = SessionConfig::from_lookup(lookup(&[
            (CACHE_NAME_VAR, "shop"),
            (MAX_INACTIVE_INTERVAL_VAR, "soon"),
        ]))
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{"cache_name": "shop"}"#).unwrap();
        assert_eq!(config, SessionConfig::new("shop"));
    }
}
