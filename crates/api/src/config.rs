//! Application configuration
//!
//! Sources are layered: struct defaults, then an optional TOML file, then
//! `SENSOR_REGISTRY__*` environment variables (`__` separates sections).

use std::path::Path;
use std::time::Duration;

use ::config::{Config, ConfigError, Environment, File};
use sensor_store::StoreConfig;
use serde::Deserialize;

/// Config file consulted when `SENSOR_REGISTRY_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/sensor-registry.toml";

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "SENSOR_REGISTRY_CONFIG";

const ENV_PREFIX: &str = "SENSOR_REGISTRY";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub address: String,
    /// Per-request deadline (seconds)
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Which [`SensorStore`](sensor_store::SensorStore) implementation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Database settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    /// sqlx connection URL (SQLite backend only)
    pub url: String,
    pub max_connections: u32,
    /// Time allowed to obtain a pooled connection (seconds)
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            url: "sqlite://sensors.db?mode=rwc".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load from the file named by `SENSOR_REGISTRY_CONFIG` (or the default
    /// path) overlaid with environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(path)
    }

    /// Load from `path` (skipped if missing) overlaid with environment variables
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.address, "0.0.0.0:8080");
        assert_eq!(config.server.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.database.backend, StoreBackend::Sqlite);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.store.page_size, 100);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = AppConfig::load_from("does/not/exist.toml").unwrap();
        assert_eq!(config.store.page_size, 100);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_file_overrides() {
        let path = std::env::temp_dir().join(format!("sensor-registry-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"
            [server]
            address = "127.0.0.1:9000"

            [database]
            backend = "memory"

            [store]
            page_size = 25

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.server.address, "127.0.0.1:9000");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.store.page_size, 25);
        assert_eq!(config.logging.format, LogFormat::Json);
    }
}
