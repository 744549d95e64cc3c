//! MotorLink - Real-time chat core
//!
//! MotorLink is the messaging subsystem of an automotive-services marketplace:
//! a REST + WebSocket layer over PostgreSQL that owns conversations, messages,
//! unread-count bookkeeping, and live presence/typing delivery.
//!
//! # Module Structure
//!
//! The library is organized into two main modules:
//!
//! - **`shared`** - Types shared between handlers, the gateway and tests
//!   - Conversation and message structures
//!   - WebSocket event envelopes
//!   - Error taxonomy
//!
//! - **`backend`** - Server-side code
//!   - Axum HTTP server with message routes
//!   - Conversation/message service over sqlx
//!   - WebSocket gateway with a live-connection registry
//!   - Token verification and the user-directory adapter
//!
//! # Delivery Model
//!
//! Messages are persisted first, then pushed to the receiver's live
//! connection if one is registered. A disconnected receiver picks the
//! message up on the next REST fetch; there is no durable delivery queue.
//!
//! # Thread Safety
//!
//! All server state is thread-safe: the live-connection map sits behind a
//! mutex-guarded registry, presence events travel over `broadcast::Sender`,
//! and every counter mutation uses an atomic store-level update rather than
//! application-level read-modify-write.

pub mod backend;
pub mod shared;
