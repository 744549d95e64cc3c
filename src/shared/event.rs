//! WebSocket Event Envelopes
//!
//! Every socket frame is a JSON envelope of the form
//! `{"event": "<name>", "data": {...}}`. Client-to-server and
//! server-to-client events are separate enums because the payload shapes
//! differ in each direction (e.g. a client sends `typing:start` with a
//! `receiverId`, the server relays it with the originating `userId`).
//!
//! # Event Flow
//!
//! | client → server | server → client |
//! |---|---|
//! | `message:send`  | `message:receive`, `message:sent`, `message:error` |
//! | `message:read`  | `message:read` (to the original sender) |
//! | `typing:start` / `typing:stop` | same name, relayed to the receiver |
//! | (connect/disconnect) | `user:online` / `user:offline` broadcast |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::chat::message::{Message, SendMessageRequest};

/// Lightweight sender profile attached to pushed messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SenderProfile {
    pub id: Uuid,
    pub username: String,
    pub photo_url: Option<String>,
    pub is_online: bool,
}

/// Events a client may send over the socket
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "message:send")]
    MessageSend(SendMessageRequest),

    #[serde(rename = "message:read", rename_all = "camelCase")]
    MessageRead { message_id: Uuid },

    #[serde(rename = "typing:start", rename_all = "camelCase")]
    TypingStart { receiver_id: Uuid },

    #[serde(rename = "typing:stop", rename_all = "camelCase")]
    TypingStop { receiver_id: Uuid },
}

/// Events the server pushes to clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Full message plus sender profile, pushed to the receiver
    #[serde(rename = "message:receive")]
    MessageReceive {
        message: Message,
        sender: SenderProfile,
    },

    /// Acknowledgment to the sender; the status label is client-visible
    #[serde(rename = "message:sent")]
    MessageSent { message: Message, status: String },

    /// Message creation failed; nothing was persisted
    #[serde(rename = "message:error")]
    MessageError { error: String, details: String },

    /// Read receipt relayed to the original sender
    #[serde(rename = "message:read", rename_all = "camelCase")]
    MessageRead {
        message_id: Uuid,
        read_by: Uuid,
        read_at: DateTime<Utc>,
    },

    #[serde(rename = "typing:start", rename_all = "camelCase")]
    TypingStart { user_id: Uuid },

    #[serde(rename = "typing:stop", rename_all = "camelCase")]
    TypingStop { user_id: Uuid },

    #[serde(rename = "user:online", rename_all = "camelCase")]
    UserOnline {
        user_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "user:offline", rename_all = "camelCase")]
    UserOffline {
        user_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl ServerEvent {
    /// The user a presence event is about, if this is one
    ///
    /// Used by socket tasks to skip echoing a user's own presence change
    /// back to them.
    pub fn presence_user(&self) -> Option<Uuid> {
        match self {
            Self::UserOnline { user_id, .. } | Self::UserOffline { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }
}
