//! Relay connection
//!
//! Represents one admitted WebSocket peer. The socket itself is owned by the
//! connection's socket task; everything else talks to it through the
//! outbound queue held here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::ws::Message;
use recipemaster_shared::ConnectionId;
use tokio::sync::{mpsc, Notify};

/// A frame queued for delivery to the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Serialized event, shared between all recipients of one fan-out
    Text(Arc<str>),
    /// Liveness probe
    Ping,
}

impl Outbound {
    pub fn into_message(self) -> Message {
        match self {
            Outbound::Text(text) => Message::Text(text.to_string()),
            Outbound::Ping => Message::Ping(Vec::new()),
        }
    }
}

/// Result of one heartbeat probe against a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Connection answered the previous probe; a new ping was queued
    Pinged,
    /// Connection never answered the previous probe and was terminated
    Terminated,
}

/// Represents an admitted relay connection
#[derive(Debug)]
pub struct Connection {
    /// Unique ID for this connection
    pub id: ConnectionId,

    /// Cleared by each heartbeat sweep, set again by the peer's pong
    alive: AtomicBool,

    /// Channel to the socket's writer task
    sender: mpsc::UnboundedSender<Outbound>,

    terminated: AtomicBool,
    terminate_signal: Notify,
}

impl Connection {
    /// Create a new connection
    pub fn new(sender: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            id: ConnectionId::new(),
            alive: AtomicBool::new(true),
            sender,
            terminated: AtomicBool::new(false),
            terminate_signal: Notify::new(),
        }
    }

    /// Queue a serialized event for this connection
    ///
    /// Returns Err if the connection is terminated or its writer is gone
    pub fn send_text(&self, payload: Arc<str>) -> Result<(), SendError> {
        self.send(Outbound::Text(payload))
    }

    fn send(&self, frame: Outbound) -> Result<(), SendError> {
        if self.terminated.load(Ordering::Acquire) {
            return Err(SendError);
        }
        self.sender.send(frame).map_err(|_| SendError)
    }

    /// Whether the transport is still open for delivery
    pub fn is_open(&self) -> bool {
        !self.terminated.load(Ordering::Acquire) && !self.sender.is_closed()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Record a probe acknowledgment from the peer
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Release);
    }

    /// Run one heartbeat step: evict if the last probe went unanswered,
    /// otherwise clear the flag and probe again.
    pub fn probe(&self) -> Probe {
        if self.alive.swap(false, Ordering::AcqRel) {
            if self.send(Outbound::Ping).is_err() {
                tracing::debug!(connection_id = %self.id, "Ping not queued, connection closing");
            }
            Probe::Pinged
        } else {
            self.terminate();
            Probe::Terminated
        }
    }

    /// Forcibly close the transport. The socket task observes this and runs
    /// the normal close path.
    pub fn terminate(&self) {
        if !self.terminated.swap(true, Ordering::AcqRel) {
            self.terminate_signal.notify_one();
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Resolves once [`terminate`](Self::terminate) has been called
    pub async fn terminated(&self) {
        if self.is_terminated() {
            return;
        }
        self.terminate_signal.notified().await;
    }
}

/// The connection can no longer accept frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection is closed")]
pub struct SendError;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_send_text_reaches_writer_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = Connection::new(tx);

        conn.send_text(Arc::from("first")).unwrap();
        conn.send_text(Arc::from("second")).unwrap();

        assert_eq!(rx.recv().await, Some(Outbound::Text(Arc::from("first"))));
        assert_eq!(rx.recv().await, Some(Outbound::Text(Arc::from("second"))));
    }

    #[tokio::test]
    async fn test_send_fails_after_writer_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Connection::new(tx);
        assert!(conn.is_open());

        drop(rx);
        assert!(!conn.is_open());
        assert_eq!(conn.send_text(Arc::from("lost")), Err(SendError));
    }

    #[tokio::test]
    async fn test_probe_pings_then_terminates_silent_peer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = Connection::new(tx);

        assert_eq!(conn.probe(), Probe::Pinged);
        assert_eq!(rx.recv().await, Some(Outbound::Ping));
        assert!(!conn.is_alive());

        // No pong before the next sweep
        assert_eq!(conn.probe(), Probe::Terminated);
        assert!(conn.is_terminated());
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn test_pong_keeps_connection_alive() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = Connection::new(tx);

        for _ in 0..5 {
            assert_eq!(conn.probe(), Probe::Pinged);
            assert_eq!(rx.recv().await, Some(Outbound::Ping));
            conn.mark_alive();
        }
        assert!(!conn.is_terminated());
    }

    #[tokio::test]
    async fn test_terminated_resolves_when_signalled_before_waiting() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = Connection::new(tx);

        conn.terminate();
        conn.terminate();

        tokio::time::timeout(Duration::from_secs(1), conn.terminated())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_terminated_wakes_waiting_task() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = Arc::new(Connection::new(tx));

        let waiter = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.terminated().await })
        };
        tokio::task::yield_now().await;
        conn.terminate();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
