//! Session record persisted in the remote store.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SessionResult;

/// Write-tracking state of a session within the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    /// No mutation since the request started.
    Clean,
    /// At least one attribute was set or removed.
    Dirty,
    /// The session was invalidated. Takes precedence over [`WriteState::Dirty`].
    Invalidated,
}

/// A session as stored in the remote store.
///
/// Carries the attributes plus the bookkeeping flags the coordinator uses to
/// decide between updating, removing or merely unlocking the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    id: String,
    creation_time: i64,
    last_accessed_time: i64,
    max_inactive_interval: i32,
    #[serde(default)]
    attributes: HashMap<String, Value>,
    is_new: bool,
    #[serde(default)]
    updated: bool,
    #[serde(default)]
    invalidated: bool,
}

impl SessionRecord {
    /// Creates a new, empty session.
    #[must_use]
    pub fn new(id: impl Into<String>, max_inactive_interval: i32) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: id.into(),
            creation_time: now,
            last_accessed_time: now,
            max_inactive_interval,
            attributes: HashMap::new(),
            is_new: true,
            updated: false,
            invalidated: false,
        }
    }

    /// Decodes a record read from the store.
    ///
    /// ## Errors
    ///
    /// Returns a serialization error if `bytes` is not a valid record.
    pub fn from_bytes(bytes: &[u8]) -> SessionResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encodes the record for the store.
    ///
    /// ## Errors
    ///
    /// Returns a serialization error if an attribute cannot be encoded.
    pub fn to_bytes(&self) -> SessionResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Creation time in epoch milliseconds.
    #[must_use]
    pub const fn creation_time(&self) -> i64 {
        self.creation_time
    }

    /// Last access time in epoch milliseconds.
    #[must_use]
    pub const fn last_accessed_time(&self) -> i64 {
        self.last_accessed_time
    }

    /// Seconds of inactivity before the store may reclaim the session.
    #[must_use]
    pub const fn max_inactive_interval(&self) -> i32 {
        self.max_inactive_interval
    }

    /// Sets the max inactive interval on this record only.
    pub fn set_max_inactive_interval(&mut self, seconds: i32) {
        self.max_inactive_interval = seconds;
    }

    /// Whether this is the first request of the session.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.is_new
    }

    /// Whether an attribute changed during the current request.
    #[must_use]
    pub const fn updated(&self) -> bool {
        self.updated
    }

    /// Whether the session was invalidated during the current request.
    #[must_use]
    pub const fn invalidated(&self) -> bool {
        self.invalidated
    }

    /// Current write-tracking state.
    #[must_use]
    pub const fn write_state(&self) -> WriteState {
        if self.invalidated {
            WriteState::Invalidated
        } else if self.updated {
            WriteState::Dirty
        } else {
            WriteState::Clean
        }
    }

    /// Marks a stored session as no longer new.
    pub fn demote(&mut self) {
        self.is_new = false;
    }

    /// Opens a new request window: clears the dirty flag and touches the session.
    pub fn begin_request(&mut self) {
        self.updated = false;
        self.last_accessed_time = Utc::now().timestamp_millis();
    }

    /// Returns an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Returns all attributes.
    #[must_use]
    pub const fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }

    /// Sets an attribute and marks the session dirty.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
        self.updated = true;
    }

    /// Removes an attribute and marks the session dirty, whether or not it existed.
    pub fn remove_attribute(&mut self, name: &str) -> Option<Value> {
        self.updated = true;
        self.attributes.remove(name)
    }

    /// Terminates the session: drops all attributes and cancels pending updates.
    pub fn invalidate(&mut self) {
        self.attributes.clear();
        self.updated = false;
        self.invalidated = true;
    }
}
