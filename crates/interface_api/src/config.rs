//! API configuration

use serde::Deserialize;

/// API configuration
///
/// Read from `API_`-prefixed environment variables, e.g. `API_PORT=9090`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Log level, used when `RUST_LOG` is not set
    pub log_level: String,
    /// When false, batch-ready notifications are dropped instead of logged
    pub notifications_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/claims_batching".to_string(),
            log_level: "info".to_string(),
            notifications_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment, on top of the defaults
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("database_url", defaults.database_url)?
            .set_default("log_level", defaults.log_level)?
            .set_default("notifications_enabled", defaults.notifications_enabled)?
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
