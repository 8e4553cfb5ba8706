//! Environment-driven configuration.
//!
//! Extracted from process environment variables via figment; `.env` files are
//! loaded by `main` before extraction. Field names map to the upper-cased
//! variable names (`DATABASE_URL`, `PORT`, `FANS_BASE_URL`, ...).

use serde::Deserialize;

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_fans_request_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Base level for the `fanscope` target when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds to wait for services to stop on shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,

    /// Base URL of the live platform API. When unset, profile data comes
    /// from the built-in mock generator.
    #[serde(default)]
    pub fans_base_url: Option<String>,

    /// Bearer token for the live platform API.
    #[serde(default)]
    pub fans_api_token: Option<String>,

    /// Per-request timeout for the live platform API, in seconds.
    #[serde(default = "default_fans_request_timeout")]
    pub fans_request_timeout: u64,
}
