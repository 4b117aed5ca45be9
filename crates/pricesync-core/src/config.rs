//! Application configuration
//!
//! Layered: an optional `config/default.toml` file first, then
//! `PRICESYNC_`-prefixed environment variables (double underscore as the
//! section separator, e.g. `PRICESYNC_SERVER__PORT=8080`).

use crate::error::{Error, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Database settings
    pub database: DatabaseConfig,
    /// Sync engine settings
    pub sync: SyncConfig,
    /// Shopify Admin API settings
    pub shopify: ShopifySettings,
    /// Google Sheets settings
    pub sheets: SheetsSettings,
}

impl AppConfig {
    /// Load from `config/default.toml` (optional) plus environment.
    pub fn load() -> Result<Self> {
        Self::load_from("config/default")
    }

    /// Load from a specific config file base name plus environment.
    pub fn load_from(base: &str) -> Result<Self> {
        Config::builder()
            .add_source(File::with_name(base).required(false))
            .add_source(Environment::with_prefix("PRICESYNC").separator("__"))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file path
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/pricesync.db"),
        }
    }
}

/// Sync engine settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Courtesy pause between rows, on top of the per-client rate limits
    pub row_delay_ms: u64,
    /// Broadcast channel capacity for live events
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            row_delay_ms: 250,
            event_capacity: 256,
        }
    }
}

impl SyncConfig {
    /// Inter-row pause as a `Duration`.
    #[must_use]
    pub fn row_delay(&self) -> Duration {
        Duration::from_millis(self.row_delay_ms)
    }
}

/// Shopify Admin API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShopifySettings {
    /// Admin API version segment
    pub api_version: String,
    /// Products per catalog listing page
    pub page_size: u32,
    /// Minimum delay between API calls, in milliseconds
    pub request_delay_ms: u64,
}

impl Default for ShopifySettings {
    fn default() -> Self {
        Self {
            api_version: "2024-01".to_string(),
            page_size: 250,
            request_delay_ms: 500,
        }
    }
}

/// Google Sheets settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SheetsSettings {
    /// Minimum delay between Sheets API calls, in milliseconds
    pub request_delay_ms: u64,
    /// Process-wide service-account file, used when a shop carries no
    /// credentials of its own
    pub service_account_path: Option<PathBuf>,
}

impl SheetsSettings {
    /// Default request delay when the field is zero/unset.
    #[must_use]
    pub fn request_delay(&self) -> Duration {
        if self.request_delay_ms == 0 {
            Duration::from_millis(1000)
        } else {
            Duration::from_millis(self.request_delay_ms)
        }
    }
}
