//! Server Initialization
//!
//! Builds the application state and router. The caller supplies the database
//! pool and configuration so tests can construct an app against their own
//! fixtures.

use axum::Router;
use sqlx::PgPool;

use crate::backend::realtime::presence::presence_channel;
use crate::backend::realtime::ConnectionRegistry;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::ServerConfig;
use crate::backend::server::state::AppState;

/// Create and configure the Axum application
///
/// Wires together:
/// 1. the live-connection registry (empty at startup; connection state is
///    not durable across restarts by design)
/// 2. the presence broadcast channel
/// 3. the router with REST routes, middleware and the WebSocket gateway
pub fn create_app(db_pool: PgPool, config: ServerConfig) -> Router<()> {
    tracing::info!("Initializing MotorLink chat server");

    let app_state = AppState {
        db_pool,
        connections: ConnectionRegistry::new(),
        presence: presence_channel(),
        config,
    };

    create_router(app_state)
}
