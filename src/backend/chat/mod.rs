//! Conversation/Message Core
//!
//! `db` holds the sqlx row mapping and raw queries; `service` is the
//! transactional boundary that composes them into the operations the REST
//! handlers and the gateway call.

pub mod db;
pub mod service;
