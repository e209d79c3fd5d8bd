//! HTTP server settings

use anyhow::Result;
use serde::Deserialize;

/// Server configuration
///
/// Loaded from `SERVER_*` environment variables, e.g. `SERVER_PORT` or
/// `SERVER_ALLOWED_ORIGINS=https://me.dev,https://admin.me.dev`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Origins allowed to make credentialed cross-origin requests
    pub allowed_origins: Vec<String>,
    /// Base URL of the dashboard, used in password reset links
    pub dashboard_url: String,
    /// Lifetime of the session cookie in days
    pub cookie_expiry_days: i64,
    /// Whether the session cookie is restricted to HTTPS
    pub cookie_secure: bool,
    /// Largest accepted request body, uploads included
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Create a new ServerConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 4000)?
            .set_default("allowed_origins", Vec::<String>::new())?
            .set_default("dashboard_url", "http://localhost:5173")?
            .set_default("cookie_expiry_days", 7)?
            .set_default("cookie_secure", true)?
            .set_default("max_upload_bytes", 10 * 1024 * 1024)?
            .add_source(
                config::Environment::with_prefix("SERVER")
                    .prefix_separator("_")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_origins"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Address to bind the listener to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            dashboard_url: "http://localhost:5173".to_string(),
            cookie_expiry_days: 7,
            cookie_secure: false,
            max_upload_bytes: 1024 * 1024,
        }
    }
}
