//! Real-time notification relay
//!
//! Pushes recipe mutation events to every connected dashboard and relays
//! peer messages between connected clients.
//!
//! # Architecture
//!
//! - **Connection**: One admitted WebSocket peer and its outbound queue
//! - **Registry**: The shared set of live connections
//! - **Heartbeat**: Ping/pong sweep that reaps dead connections
//! - **Relay**: Fan-out of peer messages and published events
//! - **Gateway**: Middleware that takes over WebSocket handshakes

pub mod connection;
pub mod gateway;
pub mod heartbeat;
pub mod registry;
pub mod relay;

pub use connection::Connection;
pub use gateway::upgrade_gateway;
pub use heartbeat::HeartbeatMonitor;
pub use registry::{ConnectionRegistry, RelayStats};
pub use relay::BroadcastRelay;
