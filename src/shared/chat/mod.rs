//! Chat Data Model
//!
//! Durable entities of the chat core: conversations with denormalized
//! last-message previews and per-participant unread counters, and messages
//! with their sent → delivered → read lifecycle.

pub mod conversation;
pub mod message;
