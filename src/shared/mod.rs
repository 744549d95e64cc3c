//! Shared Types
//!
//! Types used by both the REST handlers and the WebSocket gateway:
//! the chat data model, the socket event envelopes, and the error taxonomy.

pub mod chat;
pub mod error;
pub mod event;

pub use chat::conversation::Conversation;
pub use chat::message::{Message, MessageStatus, MessageType};
pub use error::ChatError;
pub use event::{ClientEvent, SenderProfile, ServerEvent};
