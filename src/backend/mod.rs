//! Backend Server
//!
//! Axum HTTP server exposing the REST message routes and the WebSocket
//! gateway, backed by PostgreSQL via sqlx.

pub mod auth;
pub mod chat;
pub mod error;
pub mod middleware;
pub mod realtime;
pub mod routes;
pub mod server;
