//! WebSocket Gateway Session
//!
//! Per-connection lifecycle: `Connecting → Authenticated → Active →
//! Disconnected`. No reconnection state is kept server-side; a reconnect is
//! a brand-new session.
//!
//! # Handshake
//!
//! The bearer token travels in the `token` query parameter of the upgrade
//! request, not in headers. A missing or invalid token, or an inactive user,
//! terminates the connection silently: no presence broadcast, no registry
//! entry, and no error frame; probing clients get no distinguishing signal.
//!
//! # Event Handling
//!
//! Inbound events are dispatched onto their own tasks so one user's database
//! round trip never blocks delivery of unrelated events on the same socket.
//! Malformed frames are dropped silently; read-receipt failures are logged
//! and dropped (best-effort); only the create-message path reports errors
//! back to the sender, as `message:error`.

use std::time::Instant;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::backend::auth::sessions::get_user_id_from_token;
use crate::backend::auth::users::{get_user_profile, is_user_active, set_user_online};
use crate::backend::chat::service;
use crate::backend::realtime::connections::ConnectionHandle;
use crate::backend::realtime::presence::broadcast_presence;
use crate::backend::server::state::AppState;
use crate::shared::chat::message::Message;
use crate::shared::event::{ClientEvent, ServerEvent};

/// Handshake query parameters
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// Handle a WebSocket upgrade (GET /ws?token=...)
///
/// Authentication happens before the upgrade completes; an unauthenticated
/// socket is accepted and then closed immediately without any frame, so the
/// failure mode is indistinguishable from a dropped connection.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let authenticated = authenticate(&state, params.token.as_deref()).await;
    ws.on_upgrade(move |socket| session(socket, state, authenticated))
}

/// Resolve the handshake token to an active user, or `None`
async fn authenticate(state: &AppState, token: Option<&str>) -> Option<Uuid> {
    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ => {
            tracing::debug!("[Gateway] connection attempt without token");
            return None;
        }
    };

    let user_id = match get_user_id_from_token(token) {
        Ok(id) => id,
        Err(e) => {
            tracing::debug!("[Gateway] token rejected: {}", e);
            return None;
        }
    };

    match is_user_active(&state.db_pool, user_id).await {
        Ok(true) => Some(user_id),
        Ok(false) => {
            tracing::debug!("[Gateway] inactive or unknown user {}", user_id);
            None
        }
        Err(e) => {
            tracing::warn!("[Gateway] user lookup failed during handshake: {:?}", e);
            None
        }
    }
}

/// Drive one socket session from registration to teardown
async fn session(socket: WebSocket, state: AppState, authenticated: Option<Uuid>) {
    let Some(user_id) = authenticated else {
        // Dropping the socket closes it; no registry entry, no broadcast.
        return;
    };

    let connection_id = Uuid::new_v4();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Subscribe before registering so no presence event can slip between.
    let mut presence_rx = state.presence.subscribe();

    state.connections.register(
        user_id,
        ConnectionHandle {
            connection_id,
            sender: event_tx,
        },
    );

    if let Err(e) = set_user_online(&state.db_pool, user_id, true).await {
        tracing::warn!("[Gateway] failed to mark user {} online: {:?}", user_id, e);
    }
    broadcast_presence(&state.presence, user_id, true);

    tracing::info!(
        "[Gateway] user {} connected ({} live connections)",
        user_id,
        state.connections.len()
    );

    let (mut ws_tx, mut ws_rx) = socket.split();
    let heartbeat = state.config.heartbeat_timeout;
    let mut ping_interval = tokio::time::interval(heartbeat / 2);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        last_seen = Instant::now();
                        // Handlers run concurrently so a slow database call
                        // for one event does not stall the socket.
                        let state = state.clone();
                        let payload = text.to_string();
                        tokio::spawn(async move {
                            handle_client_frame(&state, user_id, &payload).await;
                        });
                    }
                    Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => {
                        last_seen = Instant::now();
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Binary frames are not part of the protocol.
                        tracing::debug!("[Gateway] non-text frame from {} dropped", user_id);
                    }
                    Some(Err(e)) => {
                        tracing::debug!("[Gateway] socket error for {}: {:?}", user_id, e);
                        break;
                    }
                }
            }
            maybe_event = event_rx.recv() => {
                match maybe_event {
                    Some(event) => {
                        if !send_event(&mut ws_tx, &event).await {
                            break;
                        }
                    }
                    // Channel closed: a newer connection replaced this one.
                    None => break,
                }
            }
            presence = presence_rx.recv() => {
                match presence {
                    Ok(event) => {
                        // Presence goes to all *other* clients.
                        if event.presence_user() == Some(user_id) {
                            continue;
                        }
                        if !send_event(&mut ws_tx, &event).await {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "[Gateway] presence receiver for {} lagged, skipped {} events",
                            user_id,
                            skipped
                        );
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping_interval.tick() => {
                if last_seen.elapsed() > heartbeat {
                    tracing::info!("[Gateway] reaping idle connection for user {}", user_id);
                    break;
                }
                if ws_tx.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    // A disconnect racing a reconnect must not evict the newer socket:
    // deregistration is conditional on this connection id.
    if state.connections.deregister(user_id, connection_id) {
        if let Err(e) = set_user_online(&state.db_pool, user_id, false).await {
            tracing::warn!("[Gateway] failed to mark user {} offline: {:?}", user_id, e);
        }
        broadcast_presence(&state.presence, user_id, false);
        tracing::info!("[Gateway] user {} disconnected", user_id);
    } else {
        tracing::debug!(
            "[Gateway] stale connection {} for user {} closed without deregistering",
            connection_id,
            user_id
        );
    }
}

/// Serialize and write one event frame; returns false when the socket is gone
async fn send_event(
    ws_tx: &mut (impl SinkExt<WsMessage> + Unpin),
    event: &ServerEvent,
) -> bool {
    let payload = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("[Gateway] failed to serialize event: {:?}", e);
            return true;
        }
    };
    ws_tx.send(WsMessage::Text(payload.into())).await.is_ok()
}

/// Parse and dispatch one inbound frame from an authenticated connection
async fn handle_client_frame(state: &AppState, user_id: Uuid, payload: &str) {
    let event: ClientEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(e) => {
            // Malformed traffic gets no acknowledgment.
            tracing::debug!("[Gateway] malformed frame from {} dropped: {}", user_id, e);
            return;
        }
    };

    match event {
        ClientEvent::MessageSend(request) => {
            match service::create_message(&state.db_pool, user_id, &request).await {
                Ok(message) => {
                    deliver_new_message(state, &message).await;
                    state.connections.send_to(
                        user_id,
                        ServerEvent::MessageSent {
                            message,
                            status: "delivered".to_string(),
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!("[Gateway] message send from {} failed: {}", user_id, e);
                    state.connections.send_to(
                        user_id,
                        ServerEvent::MessageError {
                            error: "message could not be sent".to_string(),
                            details: e.public_message(),
                        },
                    );
                }
            }
        }
        ClientEvent::MessageRead { message_id } => {
            match service::mark_message_read(&state.db_pool, message_id, user_id).await {
                Ok(Some(message)) => {
                    relay_read_receipt(state, &message);
                }
                Ok(None) => {
                    // Caller was not the receiver; intentional idempotent ignore.
                }
                Err(e) => {
                    // Read receipts are best-effort.
                    tracing::warn!(
                        "[Gateway] read receipt for {} from {} failed: {}",
                        message_id,
                        user_id,
                        e
                    );
                }
            }
        }
        ClientEvent::TypingStart { receiver_id } => {
            state
                .connections
                .send_to(receiver_id, ServerEvent::TypingStart { user_id });
        }
        ClientEvent::TypingStop { receiver_id } => {
            state
                .connections
                .send_to(receiver_id, ServerEvent::TypingStop { user_id });
        }
    }
}

/// Push a freshly persisted message to the receiver's live connection
///
/// Also emits a `typing:stop` to the receiver, cancelling any stale typing
/// indicator now that the message arrived. A receiver without a live
/// connection simply discovers the message on the next fetch.
///
/// Returns true if the message was pushed.
pub async fn deliver_new_message(state: &AppState, message: &Message) -> bool {
    if !state.connections.is_connected(message.receiver_id) {
        return false;
    }

    let sender = match get_user_profile(&state.db_pool, message.sender_id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            tracing::warn!(
                "[Gateway] sender profile {} missing, skipping push",
                message.sender_id
            );
            return false;
        }
        Err(e) => {
            tracing::warn!("[Gateway] sender profile lookup failed: {:?}", e);
            return false;
        }
    };

    let delivered = state.connections.send_to(
        message.receiver_id,
        ServerEvent::MessageReceive {
            message: message.clone(),
            sender,
        },
    );

    state.connections.send_to(
        message.receiver_id,
        ServerEvent::TypingStop {
            user_id: message.sender_id,
        },
    );

    delivered
}

/// Relay a read receipt to the original sender's live connection, if any
pub fn relay_read_receipt(state: &AppState, message: &Message) {
    if let Some(read_at) = message.read_at {
        state.connections.send_to(
            message.sender_id,
            ServerEvent::MessageRead {
                message_id: message.id,
                read_by: message.receiver_id,
                read_at,
            },
        );
    }
}
