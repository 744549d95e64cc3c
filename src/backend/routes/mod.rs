//! HTTP Routes

pub mod message_routes;
pub mod router;
