//! Request-scoped session handle.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::SessionResult;
use crate::record::{SessionRecord, WriteState};

/// Mutable view of a session for the duration of one request.
///
/// Cloning yields another view of the same record. The handle never talks to
/// the store; every change is picked up by the coordinator once the
/// downstream handler returns.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    record: Arc<Mutex<SessionRecord>>,
}

impl SessionHandle {
    pub(crate) fn new(record: SessionRecord) -> Self {
        Self {
            record: Arc::new(Mutex::new(record)),
        }
    }

    /// Returns a copy of the wrapped record.
    #[must_use]
    pub fn snapshot(&self) -> SessionRecord {
        self.record.lock().clone()
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> String {
        self.record.lock().id().to_string()
    }

    /// Whether this is the first request of the session.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.record.lock().is_new()
    }

    /// Creation time in epoch milliseconds.
    #[must_use]
    pub fn creation_time(&self) -> i64 {
        self.record.lock().creation_time()
    }

    /// Last access time in epoch milliseconds.
    #[must_use]
    pub fn last_accessed_time(&self) -> i64 {
        self.record.lock().last_accessed_time()
    }

    /// Seconds of inactivity before the session may be reclaimed.
    #[must_use]
    pub fn max_inactive_interval(&self) -> i32 {
        self.record.lock().max_inactive_interval()
    }

    /// Changes the interval stored with this session.
    ///
    /// Does not mark the session dirty and does not change the store's
    /// default expiry policy.
    pub fn set_max_inactive_interval(&self, seconds: i32) {
        self.record.lock().set_max_inactive_interval(seconds);
    }

    /// Returns an attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.record.lock().attribute(name).cloned()
    }

    /// Returns an attribute decoded as `T`.
    ///
    /// ## Errors
    ///
    /// Returns a serialization error if the stored value does not decode as `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> SessionResult<Option<T>> {
        self.get(name)
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    /// Names of all attributes, sorted.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.record.lock().attributes().keys().cloned().collect();
        names.sort();
        names
    }

    /// Sets an attribute.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.record.lock().set_attribute(name, value.into());
    }

    /// Serializes `value` and stores it as an attribute.
    ///
    /// ## Errors
    ///
    /// Returns a serialization error if `value` cannot be encoded.
    pub fn set_serialized<T: Serialize>(&self, name: impl Into<String>, value: &T) -> SessionResult<()> {
        let value = serde_json::to_value(value)?;
        self.set(name, value);
        Ok(())
    }

    /// Removes an attribute, returning its previous value.
    pub fn remove(&self, name: &str) -> Option<Value> {
        self.record.lock().remove_attribute(name)
    }

    /// Invalidates the session. It is removed from the store when the request ends.
    pub fn invalidate(&self) {
        self.record.lock().invalidate();
    }

    /// Whether an attribute changed during this request.
    #[must_use]
    pub fn updated(&self) -> bool {
        self.record.lock().updated()
    }

    /// Whether the session was invalidated during this request.
    #[must_use]
    pub fn invalidated(&self) -> bool {
        self.record.lock().invalidated()
    }

    /// Current write-tracking state.
    #[must_use]
    pub fn write_state(&self) -> WriteState {
        self.record.lock().write_state()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    fn handle() -> SessionHandle {
        SessionHandle::new(SessionRecord::new("abc", 1800))
    }

    #[test]
    fn clones_share_the_record() {
        let a = handle();
        let b = a.clone();
        a.set("user", "alice");
        assert_eq!(b.get("user"), Some(json!("alice")));
        assert!(b.updated());
    }

    #[test]
    fn typed_attributes() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Cart {
            items: Vec<String>,
        }

        let session = handle();
        let cart = Cart {
            items: vec!["book".to_string()],
        };
        session.set_serialized("cart", &cart).unwrap();

        assert_eq!(session.get_as::<Cart>("cart").unwrap(), Some(cart));
        assert_eq!(session.get_as::<Cart>("missing").unwrap(), None);
        assert!(session.get_as::<u32>("cart").is_err());
    }

    #[test]
    fn state_machine() {
        let session = handle();
        assert_eq!(session.write_state(), WriteState::Clean);

        session.set("a", 1);
        assert_eq!(session.write_state(), WriteState::Dirty);

        session.invalidate();
        assert_eq!(session.write_state(), WriteState::Invalidated);
        assert!(session.attribute_names().is_empty());

        session.set("b", 2);
        assert_eq!(session.write_state(), WriteState::Invalidated);
    }

    #[test]
    fn interval_change_is_not_a_mutation() {
        let session = handle();
        session.set_max_inactive_interval(60);
        assert_eq!(session.max_inactive_interval(), 60);
        assert!(!session.updated());
    }

    #[test]
    fn attribute_names_are_sorted() {
        let session = handle();
        session.set("b", 2);
        session.set("a", 1);
        assert_eq!(session.attribute_names(), vec!["a", "b"]);
    }
}
