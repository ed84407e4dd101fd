//! Session error types.

use gs_store::StoreError;
use thiserror::Error;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Missing or invalid configuration, or an unusable key digest.
    ///
    /// Raised at startup; no request is served after it.
    #[error("Session configuration error: {0}")]
    Configuration(String),

    /// The remote store failed or could not be reached.
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    /// A session record could not be encoded or decoded.
    #[error("Session serialization error: {0}")]
    Serialization(String),
}

impl SessionError {
    /// Checks if this is a startup configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Checks if the store was unreachable, as opposed to rejecting an operation.
    #[must_use]
    pub const fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_unavailable())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Failure of one coordinated request.
///
/// A store failure during reconciliation never hides a failure of the
/// downstream handler: both are carried by [`HandleError::Downstream`].
#[derive(Debug, Error)]
pub enum HandleError<E> {
    /// Session lookup, creation or reconciliation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The downstream handler failed.
    #[error("Request handler failed: {error}")]
    Downstream {
        /// Error returned by the handler.
        #[source]
        error: E,
        /// Reconciliation failure that followed, if any.
        reconcile: Option<SessionError>,
    },
}

impl<E> HandleError<E> {
    /// Returns the session-side failure, whichever variant carries it.
    #[must_use]
    pub const fn session_error(&self) -> Option<&SessionError> {
        match self {
            Self::Session(err) => Some(err),
            Self::Downstream { reconcile, .. } => reconcile.as_ref(),
        }
    }

    /// Returns the downstream handler's error, if it failed.
    #[must_use]
    pub const fn downstream_error(&self) -> Option<&E> {
        match self {
            Self::Session(_) => None,
            Self::Downstream { error, .. } => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("handler exploded")]
    struct HandlerError;

    #[test]
    fn store_timeout_is_unavailable() {
        let err = SessionError::from(StoreError::Timeout);
        assert!(err.is_store_unavailable());
        assert!(!err.is_configuration());
    }

    #[test]
    fn downstream_error_keeps_both_failures() {
        let err: HandleError<HandlerError> = HandleError::Downstream {
            error: HandlerError,
            reconcile: Some(SessionError::Store(StoreError::Timeout)),
        };

        assert!(err.downstream_error().is_some());
        assert!(err.session_error().is_some());
        assert_eq!(err.to_string(), "Request handler failed: handler exploded");
    }

    #[test]
    fn session_error_is_transparent() {
        let err: HandleError<HandlerError> =
            SessionError::Configuration("cache name is empty".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Session configuration error: cache name is empty"
        );
        assert!(err.downstream_error().is_none());
    }
}
