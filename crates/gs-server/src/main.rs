//! # gridsession server
//!
//! Main entry point for the gridsession server.

#![forbid(unsafe_code)]

use gs_server::{Server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        cache_name = %config.session.cache_name,
        locking = config.session.session_locking_enabled,
        "gridsession starting..."
    );

    Server::new(config).await?.run().await
}
