//! Router Configuration
//!
//! Combines the REST message routes and the WebSocket gateway into a single
//! Axum router.
//!
//! # Route Layout
//!
//! - `/api/messages/...` - authenticated REST surface (bearer token)
//! - `/ws?token=...` - WebSocket gateway (token in the handshake query,
//!   authenticated inside the upgrade handler, not by the middleware)
//! - Fallback returns 404 for unknown routes

use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::backend::middleware::auth::auth_middleware;
use crate::backend::realtime::gateway::ws_handler;
use crate::backend::routes::message_routes;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    let api = Router::new()
        .route("/messages", post(message_routes::send_message))
        .route("/messages/unread-count", get(message_routes::unread_count))
        .route(
            "/messages/conversations",
            get(message_routes::list_conversations),
        )
        .route(
            "/messages/conversations/by-participants",
            get(message_routes::conversation_by_participants),
        )
        .route(
            "/messages/conversations/{id}",
            get(message_routes::conversation_messages),
        )
        .route(
            "/messages/conversations/{id}/read",
            patch(message_routes::mark_conversation_read),
        )
        .route(
            "/messages/{id}",
            delete(message_routes::delete_message).patch(message_routes::edit_message),
        )
        .route(
            "/messages/{id}/read",
            patch(message_routes::mark_message_read),
        )
        .layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api", api)
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .fallback(|| async { (axum::http::StatusCode::NOT_FOUND, "404 Not Found") })
        .with_state(app_state)
}
