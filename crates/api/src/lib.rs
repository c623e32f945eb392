//! RecipeMaster API Library
//!
//! Server side of the real-time notification relay: connection registry,
//! heartbeat monitor, broadcast relay and the WebSocket upgrade gateway,
//! served on the same listener as the HTTP API.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;
pub mod websocket;

pub use config::Config;
pub use error::{ApiError, ServerError};
pub use server::RelayServer;
pub use state::AppState;
