//! Client configuration

use std::time::Duration;

/// Default delay between a disconnect and the next connect attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:4000/";

/// Subscription configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay WebSocket URL, e.g. `ws://127.0.0.1:4000/`
    pub url: String,
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Reject URLs that are not WebSocket URLs and a zero reconnect delay
    pub fn validated(self) -> Result<Self, ConfigError> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(ConfigError::Invalid("relay URL must start with ws:// or wss://"));
        }
        if self.reconnect_delay.is_zero() {
            return Err(ConfigError::Invalid("reconnect delay must be greater than zero"));
        }
        Ok(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}
