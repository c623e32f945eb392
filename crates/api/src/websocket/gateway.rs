//! Connection upgrade gateway
//!
//! Runs as middleware in front of the whole router. WebSocket handshakes on
//! any path are taken over here and admitted into the registry; every other
//! request continues to the router untouched.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        FromRequestParts, Request, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::{stream::StreamExt, SinkExt};
use tokio::sync::mpsc;

use crate::error::ApiError;
use crate::state::AppState;

use super::{
    connection::{Connection, Outbound},
    relay::BroadcastRelay,
};

/// Whether the request is asking for a WebSocket upgrade
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

/// Middleware that diverts WebSocket upgrades away from the HTTP router
pub async fn upgrade_gateway(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !is_websocket_upgrade(request.headers()) {
        return next.run(request).await;
    }

    let (mut parts, _body) = request.into_parts();
    let ws = match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::warn!(
                path = %parts.uri.path(),
                reason = %rejection.body_text(),
                "Rejected WebSocket handshake"
            );
            return ApiError::BadRequest(rejection.body_text()).into_response();
        }
    };

    tracing::debug!(path = %parts.uri.path(), "WebSocket connection upgrade requested");

    let relay = state.relay.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, relay))
}

/// Drive one admitted connection until its transport closes
async fn handle_socket(socket: WebSocket, relay: BroadcastRelay) {
    let (mut sender, mut receiver) = socket.split();

    // Create channel for frames headed to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    let conn = relay.registry().add(Connection::new(tx)).await;
    let connection_id = conn.id;

    // Writer: drain the queue in order
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = sender.send(frame.into_message()).await {
                tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader: relay peer messages, record pongs
    let reader_conn = conn.clone();
    let reader_relay = relay.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    reader_relay.on_peer_message(connection_id, &text).await;
                }
                Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                    Ok(text) => {
                        reader_relay.on_peer_message(connection_id, text).await;
                    }
                    Err(e) => {
                        tracing::warn!(
                            connection_id = %connection_id,
                            error = %e,
                            "Dropping non UTF-8 binary message"
                        );
                    }
                },
                Ok(Message::Pong(_)) => reader_conn.mark_alive(),
                Ok(Message::Ping(_)) => {
                    // Axum answers pings automatically
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(connection_id = %connection_id, "WebSocket close frame received");
                    break;
                }
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket receive failed");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {}
        _ = &mut recv_task => {}
        _ = conn.terminated() => {
            tracing::debug!(connection_id = %connection_id, "Connection terminated by heartbeat");
        }
    }

    // Dropping both halves closes the transport
    send_task.abort();
    recv_task.abort();
    conn.terminate();
    relay.registry().remove(&connection_id).await;

    tracing::info!(connection_id = %connection_id, "WebSocket connection closed");
}
