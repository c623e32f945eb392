//! Application configuration

use std::env;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,

    // Relay
    pub heartbeat_interval: Duration,

    // Logging
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
            heartbeat_interval: Duration::from_secs(10),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:4000".to_string()),

            // Relay
            heartbeat_interval: {
                let millis: u64 = env::var("HEARTBEAT_INTERVAL_MS")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()
                    .map_err(|_| ConfigError::Invalid("HEARTBEAT_INTERVAL_MS must be an integer"))?;
                if millis == 0 {
                    return Err(ConfigError::Invalid(
                        "HEARTBEAT_INTERVAL_MS must be greater than zero",
                    ));
                }
                Duration::from_millis(millis)
            },

            // Logging
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}
