//! Conversation Entity
//!
//! A conversation is the durable thread between exactly two participants.
//! The pair is stored sorted ascending so lookup by pair is order-independent,
//! and a partial unique index guarantees at most one direct conversation per
//! unordered pair. The struct carries a denormalized last-message preview,
//! overwritten on every send, plus sparse per-participant unread counters.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sort two user ids into canonical (low, high) order
///
/// Both lookup and creation go through this, which is what makes
/// `(a, b)` and `(b, a)` resolve to the same conversation row.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// A direct conversation between two users
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    /// Participant pair, sorted ascending at creation time
    pub participants: [Uuid; 2],
    /// Reserved; always false in current scope
    pub is_group_chat: bool,
    pub last_message: Option<Uuid>,
    pub last_message_content: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub last_message_sender: Option<Uuid>,
    /// Per-participant unread counters; an absent entry reads as 0
    pub unread_counts: HashMap<Uuid, i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Whether the given user is one of the two participants
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participants.contains(&user_id)
    }

    /// Unread count for a participant, defaulting an absent entry to 0
    pub fn unread_for(&self, user_id: Uuid) -> i64 {
        self.unread_counts.get(&user_id).copied().unwrap_or(0)
    }

    /// The participant that is not `user_id`
    pub fn other_participant(&self, user_id: Uuid) -> Option<Uuid> {
        self.participants.iter().copied().find(|&p| p != user_id)
    }
}
