//! RecipeMaster relay client
//!
//! Keeps one logical subscription to the notification relay alive across
//! transient network failures and hands every received event to a callback.

pub mod config;
pub mod error;
pub mod state;
pub mod subscription;

pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use state::ConnectionState;
pub use subscription::Subscription;
