//! Shared application state

use crate::websocket::{BroadcastRelay, ConnectionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub relay: BroadcastRelay,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            relay: BroadcastRelay::new(ConnectionRegistry::new()),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        self.relay.registry()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
