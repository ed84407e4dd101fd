//! Server configuration.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use gs_session::SessionConfig;

/// Default name of the session cookie.
pub const DEFAULT_COOKIE_NAME: &str = "GSSESSIONID";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host to bind to.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Redis URL. Sessions are kept in process memory when absent.
    pub redis_url: Option<String>,

    /// Name of the cookie carrying the session identifier.
    pub cookie_name: String,

    /// Session coordinator settings.
    pub session: SessionConfig,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let host = std::env::var("GS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("GS_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let redis_url = std::env::var("REDIS_URL").ok().filter(|url| !url.is_empty());

        let cookie_name =
            std::env::var("GS_COOKIE_NAME").unwrap_or_else(|_| DEFAULT_COOKIE_NAME.to_string());

        let session = SessionConfig::from_env()?;

        Ok(Self {
            host,
            port,
            redis_url,
            cookie_name,
            session,
        })
    }

    /// Creates a configuration for testing.
    #[must_use]
    pub fn for_testing(cache_name: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
            redis_url: None,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            session: SessionConfig::new(cache_name),
        }
    }

    /// Returns the address to bind to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
