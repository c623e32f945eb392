//! Relay subscription handle
//!
//! One [`Subscription`] owns at most one WebSocket at a time. A single worker
//! task runs the whole reconnect cycle, so there is never more than one open
//! transport or more than one pending reconnect timer.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use recipemaster_shared::Event;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::state::ConnectionState;

type EventCallback = Arc<dyn Fn(Event) + Send + Sync>;

/// Sender half of the live transport's outbound queue, present only while connected
type Outbox = Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>;

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// A self-healing subscription to the notification relay
pub struct Subscription {
    state: watch::Receiver<ConnectionState>,
    outbox: Outbox,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Start connecting immediately and keep reconnecting until closed.
    ///
    /// `on_event` runs on the subscription's task for every inbound event.
    /// Must be called from within a Tokio runtime.
    pub fn connect<F>(config: ClientConfig, on_event: F) -> Self
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let outbox = Outbox::default();

        let worker = Worker {
            config,
            on_event: Arc::new(on_event),
            state: state_tx,
            outbox: Arc::clone(&outbox),
            shutdown: shutdown_rx,
        };

        Self {
            state: state_rx,
            outbox,
            shutdown: shutdown_tx,
            task: Some(tokio::spawn(worker.run())),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Receiver that observes every state change
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Send an event to every other peer on the relay.
    ///
    /// Fails with [`ClientError::NotConnected`] instead of buffering when
    /// there is no open transport.
    pub fn publish(&self, event: &Event) -> Result<(), ClientError> {
        let payload = event.to_json()?;
        let outbox = self.outbox.lock();
        let sender = outbox.as_ref().ok_or(ClientError::NotConnected)?;
        sender.send(payload).map_err(|_| ClientError::NotConnected)
    }

    /// Tear down: cancel any pending reconnect, close the open transport and
    /// wait for the worker to finish.
    pub async fn close(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Relay subscription task failed");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

struct Worker {
    config: ClientConfig,
    on_event: EventCallback,
    state: watch::Sender<ConnectionState>,
    outbox: Outbox,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            if self.is_shutdown() {
                break;
            }
            self.transition(ConnectionState::Connecting);

            let attempt = tokio::select! {
                result = connect_async(self.config.url.as_str()) => result,
                _ = self.shutdown.changed() => break,
            };

            match attempt {
                Ok((stream, _)) => self.run_session(stream).await,
                Err(e) => {
                    tracing::warn!(url = %self.config.url, error = %e, "Relay connect failed");
                }
            }

            if self.is_shutdown() {
                break;
            }
            self.transition(ConnectionState::Disconnected);

            tokio::select! {
                _ = tokio::time::sleep(self.config.reconnect_delay) => {
                    tracing::debug!(url = %self.config.url, "Attempting to reconnect");
                }
                _ = self.shutdown.changed() => break,
            }
        }

        self.outbox.lock().take();
        self.transition(ConnectionState::Closed);
    }

    /// Pump one open transport until it closes or shutdown is requested
    async fn run_session(&mut self, stream: WsStream) {
        let (mut sink, mut source) = stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        *self.outbox.lock() = Some(tx);
        self.transition(ConnectionState::Connected);

        loop {
            tokio::select! {
                inbound = source.next() => match inbound {
                    Some(Ok(Message::Text(text))) => self.deliver(text.as_str()),
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => self.deliver(text),
                        Err(e) => tracing::warn!(error = %e, "Dropping non UTF-8 binary message"),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Ping/pong are answered by tungstenite
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Relay connection error");
                        break;
                    }
                },
                outbound = rx.recv() => {
                    let Some(payload) = outbound else { break };
                    if let Err(e) = sink.send(Message::text(payload)).await {
                        tracing::warn!(error = %e, "Relay send failed");
                        break;
                    }
                }
                _ = self.shutdown.changed() => {
                    if let Err(e) = sink.send(Message::Close(None)).await {
                        tracing::debug!(error = %e, "Close frame not sent");
                    }
                    break;
                }
            }
        }

        self.outbox.lock().take();
    }

    fn deliver(&self, text: &str) {
        match Event::parse(text) {
            Ok(event) => {
                tracing::debug!(event_type = event.event_type(), "Relay event received");
                (self.on_event)(event);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse relay message");
            }
        }
    }

    fn transition(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::info!(from = %previous, to = %next, "Relay subscription state changed");
        }
    }

    fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }
}
