//! Relay server
//!
//! Binds the shared HTTP/WebSocket listener, starts the heartbeat monitor and
//! serves the router until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::Config;
use crate::error::ServerError;
use crate::routes::create_router;
use crate::state::AppState;
use crate::websocket::HeartbeatMonitor;

pub struct RelayServer {
    state: AppState,
    listener: TcpListener,
    heartbeat_interval: Duration,
}

impl RelayServer {
    /// Bind the listener described by the configuration
    pub async fn bind(config: &Config) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_address)
            .await
            .map_err(|source| ServerError::Bind {
                address: config.bind_address.clone(),
                source,
            })?;
        Ok(Self::from_listener(listener, config.heartbeat_interval))
    }

    /// Serve on an already bound listener
    pub fn from_listener(listener: TcpListener, heartbeat_interval: Duration) -> Self {
        Self {
            state: AppState::new(),
            listener,
            heartbeat_interval,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle for publishing events and inspecting the registry
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until the process is stopped
    pub async fn serve(self) -> Result<(), ServerError> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serve until `signal` resolves
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let heartbeat =
            HeartbeatMonitor::new(self.state.registry().clone(), self.heartbeat_interval).spawn();

        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(address = %addr, "Relay server listening");
        }

        let app = create_router(self.state);
        let result = axum::serve(self.listener, app)
            .with_graceful_shutdown(signal)
            .await
            .map_err(ServerError::Serve);

        heartbeat.abort();
        tracing::info!("Relay server stopped");
        result
    }
}
