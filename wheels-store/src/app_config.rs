use serde::Deserialize;
use std::env;
use wheels_core::{fare::DEFAULT_FARE, DEFAULT_MAX_SEATS};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_max_seats")]
    pub max_seats_per_trip: i32,
    #[serde(default = "default_fare")]
    pub default_fare: i64,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            max_seats_per_trip: DEFAULT_MAX_SEATS,
            default_fare: DEFAULT_FARE,
        }
    }
}

fn default_max_seats() -> i32 { DEFAULT_MAX_SEATS }

fn default_fare() -> i64 { DEFAULT_FARE }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/wheels".to_string(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 { 5 }

/// Redis is optional. Without it requests are not rate limited.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub requests: i64,
    pub window_seconds: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: 100,
            window_seconds: 60,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `WHEELS_AUTH__JWT_SECRET=...` sets `auth.jwt_secret`
            .add_source(config::Environment::with_prefix("WHEELS").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml(raw: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 3000

            [storage]
            backend = "memory"

            [auth]
            jwt_secret = "dev-secret"
            jwt_expiration_seconds = 3600
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.business_rules.max_seats_per_trip, 8);
        assert_eq!(config.business_rules.default_fare, 6000);
        assert_eq!(config.rate_limit.requests, 100);
        assert!(config.redis.url.is_none());
    }

    #[test]
    fn test_business_rules_override() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 8080

            [auth]
            jwt_secret = "s"
            jwt_expiration_seconds = 60

            [business_rules]
            max_seats_per_trip = 6
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.business_rules.max_seats_per_trip, 6);
        assert_eq!(config.business_rules.default_fare, 6000);
    }
}
