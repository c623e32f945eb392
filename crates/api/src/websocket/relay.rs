//! Broadcast relay
//!
//! Fans events out to every registered connection. Delivery is best effort:
//! each recipient gets its own queue push, and a failing recipient never
//! stops the rest of the fan-out or surfaces an error to the caller.

use std::sync::Arc;

use recipemaster_shared::{ConnectionId, Event};

use super::registry::ConnectionRegistry;

/// Relay entry points for peers and for the HTTP layer
#[derive(Clone)]
pub struct BroadcastRelay {
    registry: ConnectionRegistry,
}

impl BroadcastRelay {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Handle a raw message from a peer: parse it and forward it to every
    /// other open connection. Payloads that are not a JSON object are logged
    /// and dropped.
    ///
    /// Returns the number of recipients the event was queued for.
    pub async fn on_peer_message(&self, sender: ConnectionId, raw: &str) -> usize {
        let event = match Event::parse(raw) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    connection_id = %sender,
                    error = %e,
                    "Dropping unparseable peer message"
                );
                return 0;
            }
        };

        tracing::debug!(
            connection_id = %sender,
            event_type = event.event_type(),
            "Received peer message"
        );

        self.fan_out(&event, Some(sender)).await
    }

    /// Deliver an event to every open connection.
    ///
    /// Called by recipe mutation handlers after a committed change. Returns
    /// the number of recipients the event was queued for.
    pub async fn publish(&self, event: &Event) -> usize {
        self.fan_out(event, None).await
    }

    async fn fan_out(&self, event: &Event, exclude: Option<ConnectionId>) -> usize {
        let payload: Arc<str> = match event.to_json() {
            Ok(json) => Arc::from(json),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    event_type = event.event_type(),
                    "Failed to serialize relay event"
                );
                return 0;
            }
        };

        let connections = self.registry.snapshot().await;
        let total = connections.len();
        let mut success_count = 0;
        let mut failed_count = 0;

        for conn in connections {
            if Some(conn.id) == exclude || !conn.is_open() {
                continue;
            }
            match conn.send_text(Arc::clone(&payload)) {
                Ok(()) => success_count += 1,
                Err(_) => {
                    failed_count += 1;
                    tracing::warn!(
                        connection_id = %conn.id,
                        "Failed to send event to connection (likely closed)"
                    );
                }
            }
        }

        tracing::debug!(
            event_type = event.event_type(),
            recipients = success_count,
            failed = failed_count,
            total_connections = total,
            "Broadcast event"
        );

        success_count
    }
}
