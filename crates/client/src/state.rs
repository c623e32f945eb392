//! Subscription connection states

use std::fmt;

/// Where the subscription is in its reconnect cycle
///
/// `Connecting → Connected → Disconnected → Connecting → …` until teardown
/// moves it to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A connect attempt is in flight
    Connecting,
    /// Transport is open and events are flowing
    Connected,
    /// Transport is gone; a single reconnect is scheduled
    Disconnected,
    /// Torn down, no further attempts
    Closed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Closed => "closed",
        };
        f.write_str(label)
    }
}
