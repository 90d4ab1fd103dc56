//! `WebSocket` handler for the live day feed.
//!
//! Clients connect to `GET /ws/days`, receive the current snapshot as a
//! `state` message, then every [`ObserverMessage`] in commit order as the
//! engine commits days. A client that falls behind the broadcast buffer
//! is skipped ahead and should re-fetch `/snapshot` to re-sync.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, warn};

use aicity_types::ObserverMessage;

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming day messages.
///
/// # Route
///
/// `GET /ws/days`
pub async fn ws_days(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: send the connect-time snapshot,
/// subscribe to the broadcast channel, and forward each message.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("observer connected");

    // Subscribe before the snapshot so nothing slips between them.
    let mut rx = state.subscribe();

    if let Some(snapshot) = state.snapshot().await {
        let hello = ObserverMessage::State {
            day: snapshot.day,
            snapshot: Box::new(snapshot),
        };
        if send_json(&mut socket, &hello).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(message) => {
                        if send_json(&mut socket, &message).await.is_err() {
                            debug!("observer disconnected (send failed)");
                            return;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        // Dropped from the live feed; the client must
                        // re-sync from the snapshot endpoint.
                        warn!(skipped = n, "observer lagged, skipping ahead");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("broadcast channel closed, shutting down socket");
                        return;
                    }
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("observer disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("observer disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("websocket error: {e}");
                        return;
                    }
                    _ => {
                        // Observers have nothing to say; ignore.
                    }
                }
            }
        }
    }
}

/// Serialize and send one message as a text frame.
async fn send_json(
    socket: &mut WebSocket,
    message: &ObserverMessage,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            warn!("failed to serialize observer message: {e}");
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await
}
