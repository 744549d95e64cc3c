//! Application State Management
//!
//! This module defines the application state structure and implements the
//! `FromRef` traits for Axum state extraction.
//!
//! # Thread Safety
//!
//! All fields are designed for concurrent access:
//! - `PgPool` is internally reference-counted
//! - `ConnectionRegistry` guards its map with a mutex
//! - `broadcast::Sender` is thread-safe and cloneable

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::backend::realtime::{ConnectionRegistry, PresenceBroadcast};
use crate::backend::server::config::ServerConfig;

/// Central state container for the Axum application
///
/// # Fields
///
/// * `db_pool` - PostgreSQL connection pool
/// * `connections` - live-connection registry (user id → socket handle)
/// * `presence` - broadcast channel for `user:online`/`user:offline` events
/// * `config` - runtime configuration (port, heartbeat window)
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub connections: ConnectionRegistry,
    pub presence: PresenceBroadcast,
    pub config: ServerConfig,
}

/// Allow handlers to extract just the pool
impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}

/// Allow handlers to extract just the connection registry
impl FromRef<AppState> for ConnectionRegistry {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.connections.clone()
    }
}

/// Allow handlers to extract just the presence broadcast sender
impl FromRef<AppState> for PresenceBroadcast {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.presence.clone()
    }
}
