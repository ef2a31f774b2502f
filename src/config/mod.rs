use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Root configuration, grouped by concern.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub booking: BookingConfig,
    pub catalog: CatalogConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub features: FeatureFlags,
    pub hall_layouts_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

/// Without a URL the availability cache is off.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    pub max_seats_per_booking: usize,
    pub reserve_max_attempts: u32,
    pub ledger_max_attempts: u32,
    pub reconcile_interval_seconds: u64,
    /// How far back the reconciler looks at already started shows.
    pub reconcile_lookback_hours: i64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_seats_per_booking: 8,
            reserve_max_attempts: 3,
            ledger_max_attempts: 3,
            reconcile_interval_seconds: 300,
            reconcile_lookback_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    pub enable_availability_cache: bool,
    pub enable_reconciler: bool,
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn at_least<T>(key: &'static str, value: T, min: T) -> Result<T, ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: format!("must be at least {min}"),
        });
    }
    Ok(value)
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let booking_defaults = BookingConfig::default();

        Ok(Config {
            app: AppConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "PORT", 8000)?,
                environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
                rust_log: lookup("RUST_LOG")
                    .unwrap_or_else(|| "cinema_booking=debug,tower_http=debug".to_string()),
                log_format: parse_or(&lookup, "LOG_FORMAT", LogFormat::Pretty)?,
            },
            database: DatabaseConfig {
                url: required(&lookup, "DATABASE_URL")?,
                pool_size: parse_or(&lookup, "DB_POOL_SIZE", 20)?,
            },
            redis: RedisConfig {
                url: lookup("REDIS_URL").filter(|v| !v.trim().is_empty()),
            },
            jwt: JwtConfig {
                secret: required(&lookup, "JWT_SECRET")?,
            },
            booking: BookingConfig {
                max_seats_per_booking: at_least(
                    "MAX_SEATS_PER_BOOKING",
                    parse_or(
                        &lookup,
                        "MAX_SEATS_PER_BOOKING",
                        booking_defaults.max_seats_per_booking,
                    )?,
                    1,
                )?,
                reserve_max_attempts: parse_or(
                    &lookup,
                    "RESERVE_MAX_ATTEMPTS",
                    booking_defaults.reserve_max_attempts,
                )?,
                ledger_max_attempts: parse_or(
                    &lookup,
                    "LEDGER_MAX_ATTEMPTS",
                    booking_defaults.ledger_max_attempts,
                )?,
                reconcile_interval_seconds: parse_or(
                    &lookup,
                    "RECONCILE_INTERVAL_SECONDS",
                    booking_defaults.reconcile_interval_seconds,
                )?,
                reconcile_lookback_hours: at_least(
                    "RECONCILE_LOOKBACK_HOURS",
                    parse_or(
                        &lookup,
                        "RECONCILE_LOOKBACK_HOURS",
                        booking_defaults.reconcile_lookback_hours,
                    )?,
                    0,
                )?,
            },
            catalog: CatalogConfig {
                base_url: lookup("TMDB_BASE_URL")
                    .unwrap_or_else(|| "https://api.themoviedb.org/3".to_string()),
                api_key: lookup("TMDB_API_KEY").filter(|v| !v.trim().is_empty()),
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: parse_or(&lookup, "CIRCUIT_BREAKER_FAILURE_THRESHOLD", 5)?,
                timeout_seconds: parse_or(&lookup, "CIRCUIT_BREAKER_TIMEOUT_SECONDS", 60)?,
            },
            features: FeatureFlags {
                enable_availability_cache: parse_or(&lookup, "ENABLE_AVAILABILITY_CACHE", true)?,
                enable_reconciler: parse_or(&lookup, "ENABLE_RECONCILER", true)?,
            },
            hall_layouts_path: lookup("HALL_LAYOUTS_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}
