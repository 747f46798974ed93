use std::env;
use std::fmt;
use std::time::Duration;

use crate::scoring::UserId;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub scoring: ScoringConfig,
    pub telemetry: TelemetryConfig,
    /// User scored when a request names none.
    pub default_user: Option<UserId>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );
        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let oracle_timeout_ms = parse_var("ADLER_ORACLE_TIMEOUT_MS", 2000u64)?;
        if oracle_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "ADLER_ORACLE_TIMEOUT_MS",
                value: "0".to_string(),
            });
        }
        let oracle_timeout = Duration::from_millis(oracle_timeout_ms);
        let batch_concurrency = parse_var("ADLER_BATCH_CONCURRENCY", 8usize)?;
        if batch_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "ADLER_BATCH_CONCURRENCY",
                value: "0".to_string(),
            });
        }
        let oracle_retries = parse_var("ADLER_ORACLE_RETRIES", 0u32)?;
        let retry_backoff = Duration::from_millis(parse_var("ADLER_RETRY_BACKOFF_MS", 50)?);

        let default_user = match env::var("ADLER_DEFAULT_USER") {
            Ok(raw) if !raw.trim().is_empty() => Some(UserId(parse_value(
                "ADLER_DEFAULT_USER",
                &raw,
            )?)),
            _ => None,
        };

        Ok(Self {
            environment,
            scoring: ScoringConfig {
                oracle_timeout,
                batch_concurrency,
                oracle_retries,
                retry_backoff,
            },
            telemetry: TelemetryConfig { log_level },
            default_user,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

/// Limits for oracle lookups during batch scoring.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub oracle_timeout: Duration,
    pub batch_concurrency: usize,
    pub oracle_retries: u32,
    pub retry_backoff: Duration,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, value } => {
                write!(f, "{key} has an invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
