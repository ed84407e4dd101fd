//! Application state management.
//!
//! This module defines the shared state that is passed to all request handlers.

use std::sync::Arc;

use gs_session::{SessionCoordinator, SessionResult};
use gs_store::RemoteStore;

use crate::config::ServerConfig;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Session coordinator.
    pub sessions: Arc<SessionCoordinator>,
}

impl AppState {
    /// Creates a new application state over `store`.
    ///
    /// ## Errors
    ///
    /// Returns a configuration error if the session settings are invalid.
    pub fn new(config: ServerConfig, store: Arc<dyn RemoteStore>) -> SessionResult<Self> {
        let sessions = SessionCoordinator::new(config.session.clone(), store)?;
        Ok(Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
        })
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the session coordinator.
    #[must_use]
    pub fn sessions(&self) -> &SessionCoordinator {
        &self.sessions
    }
}
