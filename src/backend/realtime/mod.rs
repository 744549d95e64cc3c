//! Realtime Gateway
//!
//! Bridges live socket state with persisted message state: the
//! live-connection registry maps each user to at most one open socket,
//! presence changes fan out over a broadcast channel, and the gateway
//! session drives the per-connection protocol
//! (auth → register → relay → deregister).

pub mod connections;
pub mod gateway;
pub mod presence;

pub use connections::{ConnectionHandle, ConnectionRegistry};
pub use presence::PresenceBroadcast;
