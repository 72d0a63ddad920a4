//! Stream Service Settings
//!
//! Configuration types loaded from environment variables. Every value has
//! a default; unparseable values fall back to it, while values that would
//! stall the service (zero interval, zero queue) are rejected.

use std::time::Duration;

use crate::application::services::{BroadcastLoopSettings, CacheTtl, SessionSettings};
use crate::infrastructure::websocket::ConnectionSettings;

/// Where category data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataMode {
    /// Synthetic quotes around fixed reference levels.
    #[default]
    Demo,
    /// No upstream; every category is empty.
    Null,
}

impl DataMode {
    /// Parse data mode from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "null" | "none" | "off" => Self::Null,
            _ => Self::Demo,
        }
    }

    /// Get the mode name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Demo => "demo",
            Self::Null => "null",
        }
    }
}

/// Shared cache store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackend {
    /// No shared store; only the in-process freshness records.
    #[default]
    None,
    /// Process-local store with expiry.
    Memory,
    /// Redis at `REDIS_URL`.
    Redis,
}

impl CacheBackend {
    /// Parse backend from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" => Self::Memory,
            "redis" => Self::Redis,
            _ => Self::None,
        }
    }

    /// Get the backend name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Memory => "memory",
            Self::Redis => "redis",
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSettings {
    /// Port serving REST, WebSocket, health and metrics routes.
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 8000 }
    }
}

/// Cache settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Shared store backend.
    pub backend: CacheBackend,
    /// Category freshness lifetime in seconds (zero or negative disables).
    pub snapshot_ttl_secs: i64,
    /// Redis connection URL, used when `backend` is Redis.
    pub redis_url: String,
}

impl CacheSettings {
    /// Cache lifetime derived from `snapshot_ttl_secs`.
    #[must_use]
    pub fn ttl(&self) -> CacheTtl {
        CacheTtl::from_secs(self.snapshot_ttl_secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::None,
            snapshot_ttl_secs: 10,
            redis_url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// Market session settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketSettings {
    /// Exchange offset from UTC in minutes.
    pub utc_offset_minutes: i32,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 480,
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamConfig {
    /// Upstream data mode.
    pub data_mode: DataMode,
    /// Server settings.
    pub server: ServerSettings,
    /// Broadcast loop timing.
    pub broadcast: BroadcastLoopSettings,
    /// Cache settings.
    pub cache: CacheSettings,
    /// Per-connection settings.
    pub connection: ConnectionSettings,
    /// Market session settings.
    pub market: MarketSettings,
}

impl StreamConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let defaults = Self::default();

        let data_mode = env
            .get("WALLBOARD_DATA_MODE")
            .map(|s| DataMode::from_str_case_insensitive(&s))
            .unwrap_or_default();

        let server = ServerSettings {
            http_port: env.parse("WALLBOARD_HTTP_PORT", defaults.server.http_port),
        };

        let broadcast = BroadcastLoopSettings {
            interval: env.duration_secs(
                "WALLBOARD_REFRESH_INTERVAL_SECS",
                defaults.broadcast.interval,
            ),
            error_backoff: env.duration_secs(
                "WALLBOARD_ERROR_BACKOFF_SECS",
                defaults.broadcast.error_backoff,
            ),
        };

        let cache = CacheSettings {
            backend: env
                .get("WALLBOARD_CACHE_BACKEND")
                .map(|s| CacheBackend::from_str_case_insensitive(&s))
                .unwrap_or_default(),
            snapshot_ttl_secs: env.parse(
                "WALLBOARD_SNAPSHOT_CACHE_TTL_SECS",
                defaults.cache.snapshot_ttl_secs,
            ),
            redis_url: env
                .get("REDIS_URL")
                .unwrap_or(defaults.cache.redis_url),
        };

        let connection = ConnectionSettings {
            queue_capacity: env.parse(
                "WALLBOARD_SUBSCRIBER_QUEUE_CAPACITY",
                defaults.connection.queue_capacity,
            ),
            session: SessionSettings {
                idle_timeout: env.duration_secs(
                    "WALLBOARD_IDLE_TIMEOUT_SECS",
                    defaults.connection.session.idle_timeout,
                ),
            },
        };

        let market = MarketSettings {
            utc_offset_minutes: env.parse(
                "WALLBOARD_MARKET_UTC_OFFSET_MINUTES",
                defaults.market.utc_offset_minutes,
            ),
        };

        let config = Self {
            data_mode,
            server,
            broadcast,
            cache,
            connection,
            market,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with.
    ///
    /// # Errors
    ///
    /// Returns the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broadcast.interval.is_zero() {
            return Err(ConfigError::MustBePositive(
                "WALLBOARD_REFRESH_INTERVAL_SECS".to_string(),
            ));
        }
        if self.connection.session.idle_timeout.is_zero() {
            return Err(ConfigError::MustBePositive(
                "WALLBOARD_IDLE_TIMEOUT_SECS".to_string(),
            ));
        }
        if self.connection.queue_capacity == 0 {
            return Err(ConfigError::MustBePositive(
                "WALLBOARD_SUBSCRIBER_QUEUE_CAPACITY".to_string(),
            ));
        }
        if self.market.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::OutOfRange {
                key: "WALLBOARD_MARKET_UTC_OFFSET_MINUTES".to_string(),
                value: self.market.utc_offset_minutes.to_string(),
            });
        }
        if self.cache.backend == CacheBackend::Redis && self.cache.redis_url.trim().is_empty() {
            return Err(ConfigError::EmptyValue("REDIS_URL".to_string()));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Value must be greater than zero.
    #[error("environment variable {0} must be greater than zero")]
    MustBePositive(String),
    /// Value is outside the accepted range.
    #[error("environment variable {key} is out of range: {value}")]
    OutOfRange {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn duration_secs(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(default, Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StreamConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StreamConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config, StreamConfig::default());
        assert_eq!(config.data_mode, DataMode::Demo);
        assert_eq!(config.server.http_port, 8000);
        assert_eq!(config.broadcast.interval, Duration::from_secs(15));
        assert_eq!(config.broadcast.error_backoff, Duration::from_secs(5));
        assert_eq!(config.cache.ttl(), CacheTtl::Enabled(Duration::from_secs(10)));
        assert_eq!(config.connection.queue_capacity, 32);
        assert_eq!(
            config.connection.session.idle_timeout,
            Duration::from_secs(30)
        );
        assert_eq!(config.market.utc_offset_minutes, 480);
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("WALLBOARD_DATA_MODE", "NULL"),
            ("WALLBOARD_HTTP_PORT", "9100"),
            ("WALLBOARD_REFRESH_INTERVAL_SECS", "3"),
            ("WALLBOARD_ERROR_BACKOFF_SECS", "1"),
            ("WALLBOARD_SNAPSHOT_CACHE_TTL_SECS", "0"),
            ("WALLBOARD_IDLE_TIMEOUT_SECS", "45"),
            ("WALLBOARD_SUBSCRIBER_QUEUE_CAPACITY", "8"),
            ("WALLBOARD_CACHE_BACKEND", "redis"),
            ("REDIS_URL", "redis://cache:6379/2"),
            ("WALLBOARD_MARKET_UTC_OFFSET_MINUTES", "-300"),
        ])
        .unwrap();

        assert_eq!(config.data_mode, DataMode::Null);
        assert_eq!(config.server.http_port, 9100);
        assert_eq!(config.broadcast.interval, Duration::from_secs(3));
        assert_eq!(config.broadcast.error_backoff, Duration::from_secs(1));
        assert_eq!(config.cache.ttl(), CacheTtl::Disabled);
        assert_eq!(config.cache.backend, CacheBackend::Redis);
        assert_eq!(config.cache.redis_url, "redis://cache:6379/2");
        assert_eq!(config.connection.queue_capacity, 8);
        assert_eq!(
            config.connection.session.idle_timeout,
            Duration::from_secs(45)
        );
        assert_eq!(config.market.utc_offset_minutes, -300);
    }

    #[test]
    fn negative_ttl_disables_cache() {
        let config = load(&[("WALLBOARD_SNAPSHOT_CACHE_TTL_SECS", "-5")]).unwrap();
        assert_eq!(config.cache.ttl(), CacheTtl::Disabled);
    }

    #[test]
    fn unparseable_values_fall_back() {
        let config = load(&[
            ("WALLBOARD_HTTP_PORT", "eighty"),
            ("WALLBOARD_REFRESH_INTERVAL_SECS", "-1"),
            ("WALLBOARD_CACHE_BACKEND", "memcached"),
        ])
        .unwrap();
        assert_eq!(config.server.http_port, 8000);
        assert_eq!(config.broadcast.interval, Duration::from_secs(15));
        assert_eq!(config.cache.backend, CacheBackend::None);
    }

    #[test]
    fn zero_interval_rejected() {
        assert_eq!(
            load(&[("WALLBOARD_REFRESH_INTERVAL_SECS", "0")]),
            Err(ConfigError::MustBePositive(
                "WALLBOARD_REFRESH_INTERVAL_SECS".to_string()
            ))
        );
    }

    #[test]
    fn zero_idle_timeout_rejected() {
        assert!(matches!(
            load(&[("WALLBOARD_IDLE_TIMEOUT_SECS", "0")]),
            Err(ConfigError::MustBePositive(_))
        ));
    }

    #[test]
    fn zero_queue_capacity_rejected() {
        assert!(matches!(
            load(&[("WALLBOARD_SUBSCRIBER_QUEUE_CAPACITY", "0")]),
            Err(ConfigError::MustBePositive(_))
        ));
    }

    #[test]
    fn offset_out_of_range_rejected() {
        assert!(matches!(
            load(&[("WALLBOARD_MARKET_UTC_OFFSET_MINUTES", "1440")]),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn blank_values_use_defaults() {
        let config = load(&[("REDIS_URL", "  "), ("WALLBOARD_HTTP_PORT", "")]).unwrap();
        assert_eq!(config.cache.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.server.http_port, 8000);
    }

    #[test]
    fn mode_and_backend_parsing() {
        assert_eq!(DataMode::from_str_case_insensitive("demo"), DataMode::Demo);
        assert_eq!(DataMode::from_str_case_insensitive("Null"), DataMode::Null);
        assert_eq!(DataMode::from_str_case_insensitive("wind"), DataMode::Demo);
        assert_eq!(
            CacheBackend::from_str_case_insensitive("MEMORY"),
            CacheBackend::Memory
        );
        assert_eq!(CacheBackend::Redis.as_str(), "redis");
        assert_eq!(DataMode::Null.as_str(), "null");
    }
}
