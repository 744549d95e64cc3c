//! Message Entity and Lifecycle
//!
//! A message belongs to exactly one conversation (`conversation_id` is set at
//! creation time) and moves through `sent → delivered → read`, never
//! backwards. Soft delete and edit both preserve the original content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder content stored in place of a soft-deleted message
pub const DELETED_MESSAGE_PLACEHOLDER: &str = "This message was deleted";

/// Kind of message payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
}

impl MessageType {
    /// Database column representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::File => "file",
        }
    }

    /// Parse the database column representation, defaulting unknown values to text
    pub fn from_str(s: &str) -> Self {
        match s {
            "image" => Self::Image,
            "file" => Self::File,
            _ => Self::Text,
        }
    }
}

/// Delivery status of a message, monotonically non-decreasing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    /// Database column representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }

    /// Parse the database column representation, defaulting unknown values to sent
    pub fn from_str(s: &str) -> Self {
        match s {
            "delivered" => Self::Delivered,
            "read" => Self::Read,
            _ => Self::Sent,
        }
    }

    /// Ordering rank used to enforce monotone status transitions
    pub fn rank(&self) -> u8 {
        match self {
            Self::Sent => 0,
            Self::Delivered => 1,
            Self::Read => 2,
        }
    }
}

/// One chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub status: MessageStatus,
    pub read_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub is_edited: bool,
    pub original_content: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Content to preserve when this message is edited or deleted
    ///
    /// The original is captured once, on the first mutation; later edits
    /// must not overwrite it.
    pub fn preserved_original(&self) -> String {
        self.original_content
            .clone()
            .unwrap_or_else(|| self.content.clone())
    }
}

/// Request body for creating a message (REST) or the `message:send` payload (socket)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub content: String,
    #[serde(rename = "type", default)]
    pub message_type: Option<MessageType>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<i64>,
}

/// Request body for editing a message
#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_message(content: &str, original: Option<&str>) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            content: content.to_string(),
            message_type: MessageType::Text,
            file_url: None,
            file_name: None,
            file_size: None,
            status: MessageStatus::Sent,
            read_at: None,
            is_deleted: false,
            is_edited: false,
            original_content: original.map(|s| s.to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_preserved_original_first_edit() {
        let message = sample_message("hello", None);
        assert_eq!(message.preserved_original(), "hello");
    }

    #[test]
    fn test_preserved_original_not_overwritten_on_second_edit() {
        // After a first edit the original is already captured; a second
        // edit must keep the pre-first-edit content.
        let message = sample_message("hello (edited)", Some("hello"));
        assert_eq!(message.preserved_original(), "hello");
    }

    #[test]
    fn test_status_rank_is_monotone() {
        assert!(MessageStatus::Sent.rank() < MessageStatus::Delivered.rank());
        assert!(MessageStatus::Delivered.rank() < MessageStatus::Read.rank());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            MessageStatus::Sent,
            MessageStatus::Delivered,
            MessageStatus::Read,
        ] {
            assert_eq!(MessageStatus::from_str(status.as_str()), status);
        }
    }

    #[test]
    fn test_message_type_unknown_defaults_to_text() {
        assert_eq!(MessageType::from_str("sticker"), MessageType::Text);
    }

    #[test]
    fn test_send_request_deserializes_with_defaults() {
        let json = r#"{"receiverId":"7b7c2ba1-33bb-4ee0-9b9f-2d0b4a6fb178","content":"hi"}"#;
        let request: SendMessageRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.content, "hi");
        assert_eq!(request.message_type, None);
        assert_eq!(request.file_url, None);
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let message = sample_message("hello", None);
        let json = serde_json::to_value(&message).unwrap();
        assert!(json.get("conversationId").is_some());
        assert!(json.get("senderId").is_some());
        assert_eq!(json["type"], "text");
        assert_eq!(json["status"], "sent");
    }
}
