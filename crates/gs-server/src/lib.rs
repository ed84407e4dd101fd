//! # gs-server
//!
//! Axum server for gridsession.
//!
//! This crate wires the session coordinator into an HTTP stack:
//! - A session middleware that resolves the session from a cookie and
//!   reconciles it with the store after every request
//! - A [`Session`] extractor for handlers
//! - Session inspection endpoints and a health check
//!
//! Sessions live in Redis when `REDIS_URL` is set and in process memory
//! otherwise.
//!
//! ## Usage
//!
//! ```ignore
//! use gs_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::from_env()?;
//! let server = Server::new(config).await?;
//! server.run().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod router;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use router::create_router;
pub use session::{session_layer, Session};
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use gs_store::{MemoryStore, RemoteStore};
use gs_store_redis::{RedisConfig, RedisStore};
use tokio::net::TcpListener;

/// The gridsession server.
pub struct Server {
    config: ServerConfig,
    store: Arc<dyn RemoteStore>,
}

impl Server {
    /// Creates a new server instance.
    ///
    /// This connects to the session store and validates the configuration.
    pub async fn new(config: ServerConfig) -> anyhow::Result<Self> {
        config.session.validate()?;

        let store: Arc<dyn RemoteStore> = match &config.redis_url {
            Some(url) => {
                let store =
                    RedisStore::connect(RedisConfig::from_url(url.clone()), &config.session.cache_name)
                        .await?;
                tracing::info!("Redis session store connected");
                Arc::new(store)
            }
            None => {
                tracing::warn!("REDIS_URL not set, sessions are kept in process memory");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self { config, store })
    }

    /// Runs the server.
    ///
    /// This starts the HTTP server and blocks until it receives a shutdown signal.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr: SocketAddr = self.config.bind_address().parse()?;
        let app = self.router()?;

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Server listening on http://{}", addr);

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Builds the router without starting the server.
    pub fn router(&self) -> anyhow::Result<Router> {
        let state = AppState::new(self.config.clone(), Arc::clone(&self.store))?;
        Ok(create_router(state))
    }
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
