//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Ledger calendar configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Change-event dispatcher configuration.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    /// Metrics snapshot cache configuration.
    #[serde(default)]
    pub metrics_cache: MetricsCacheConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
///
/// When `url` is absent the server runs on the in-memory store.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: Option<String>,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Ledger calendar configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// IANA timezone used for month ids and day/month ranges.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Change-event dispatcher configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    /// Delay between polls of the outbox, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Maximum events delivered per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    /// Deliveries attempted before an event is parked.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_poll_interval() -> u64 {
    500
}

fn default_batch_size() -> u64 {
    100
}

fn default_max_attempts() -> u32 {
    10
}

/// Metrics snapshot cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsCacheConfig {
    /// Maximum number of tenant snapshots kept.
    #[serde(default = "default_cache_capacity")]
    pub capacity: u64,
    /// Time-to-live for a snapshot, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for MetricsCacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_cache_capacity() -> u64 {
    1_000
}

fn default_cache_ttl() -> u64 {
    300
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("SOLARIS").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment_with_defaults() {
        temp_env::with_vars(
            [
                ("SOLARIS__JWT__SECRET", Some("env-secret")),
                ("SOLARIS__SERVER__PORT", Some("9090")),
                ("SOLARIS__DATABASE__URL", None::<&str>),
                ("RUN_MODE", Some("test-nonexistent")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.jwt.secret, "env-secret");
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.server.host, "0.0.0.0");
                assert!(config.database.url.is_none());
                assert_eq!(config.ledger.timezone, "UTC");
                assert_eq!(config.dispatcher.max_attempts, 10);
                assert_eq!(config.metrics_cache.ttl_secs, 300);
                assert!(!config.logging.json);
            },
        );
    }

    #[test]
    fn test_load_reads_nested_sections() {
        temp_env::with_vars(
            [
                ("SOLARIS__JWT__SECRET", Some("s")),
                ("SOLARIS__LEDGER__TIMEZONE", Some("America/Sao_Paulo")),
                ("SOLARIS__DISPATCHER__BATCH_SIZE", Some("25")),
                ("RUN_MODE", Some("test-nonexistent")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.ledger.timezone, "America/Sao_Paulo");
                assert_eq!(config.dispatcher.batch_size, 25);
            },
        );
    }

    #[test]
    fn test_load_requires_jwt_secret() {
        temp_env::with_vars(
            [
                ("SOLARIS__JWT__SECRET", None::<&str>),
                ("RUN_MODE", Some("test-nonexistent")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
