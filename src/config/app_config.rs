use std::time::Duration;

use serde::Deserialize;

use crate::domain::cache::DEFAULT_NAMESPACE;
use crate::infrastructure::cache::CacheConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cache: CacheSettings,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// `cache` section; durations are plain numbers so they can come from env vars
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    pub namespace: String,
    pub default_ttl_secs: u64,
    pub local_backfill_ttl_secs: u64,
    pub probe_interval_secs: u64,
    pub operation_timeout_ms: u64,
    pub connection_timeout_ms: u64,
    pub local_max_entries: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer token for destructive admin routes; unset disables them
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_ttl_secs: 3600,
            local_backfill_ttl_secs: 3600,
            probe_interval_secs: 60,
            operation_timeout_ms: 3000,
            connection_timeout_ms: 5000,
            local_max_entries: None,
        }
    }
}

impl CacheSettings {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            // An empty APP__CACHE__REDIS_URL means no persistent tier.
            redis_url: self
                .redis_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            namespace: self.namespace.clone(),
            default_ttl: Duration::from_secs(self.default_ttl_secs),
            local_backfill_ttl: Duration::from_secs(self.local_backfill_ttl_secs),
            probe_interval: Duration::from_secs(self.probe_interval_secs),
            operation_timeout: Duration::from_millis(self.operation_timeout_ms),
            connection_timeout: Duration::from_millis(self.connection_timeout_ms),
            local_max_entries: self.local_max_entries,
        }
    }
}

impl AdminConfig {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
