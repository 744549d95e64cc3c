//! Conversation/Message Service
//!
//! The transactional boundary for the chat core. Each operation here is one
//! request's worth of work: find-or-create the conversation, append the
//! message, and mutate the unread counters with store-level atomic updates.
//!
//! # Concurrency Contracts
//!
//! - Two simultaneous first-contact sends between the same pair yield exactly
//!   one conversation: creation races lose to the partial unique index on the
//!   sorted pair, and the loser re-reads the winner's row.
//! - Unread increments and decrements are single SQL statements, so
//!   concurrent sends while the receiver is mid-conversation never lose
//!   updates.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::backend::chat::db;
use crate::shared::chat::conversation::{canonical_pair, Conversation};
use crate::shared::chat::message::{
    Message, MessageStatus, MessageType, SendMessageRequest, DELETED_MESSAGE_PLACEHOLDER,
};
use crate::shared::error::ChatError;

/// Default page size for conversation message listings
pub const DEFAULT_MESSAGE_LIMIT: i64 = 50;

/// Find the direct conversation for a pair of users, creating it if absent
///
/// Behaves as if serialized per participant pair: a lost creation race is
/// treated as "someone else created it first" and resolved by re-reading.
pub async fn find_or_create_conversation(
    pool: &PgPool,
    user_a: Uuid,
    user_b: Uuid,
) -> Result<Conversation, ChatError> {
    let (low, high) = canonical_pair(user_a, user_b);

    if let Some(conversation) = db::get_conversation_by_pair(pool, low, high).await? {
        return Ok(conversation);
    }

    match db::insert_conversation(pool, low, high).await {
        Ok(conversation) => Ok(conversation),
        Err(e) if db::is_unique_violation(&e) => {
            // A concurrent caller won the race; their row is authoritative.
            tracing::debug!("conversation creation race for pair ({low}, {high}), re-reading");
            db::get_conversation_by_pair(pool, low, high)
                .await?
                .ok_or_else(|| {
                    ChatError::conflict("conversation creation race could not be resolved")
                })
        }
        Err(e) => Err(e.into()),
    }
}

/// Create a message and update the conversation's preview and unread counter
///
/// Validates the request, resolves (or creates) the conversation, then in a
/// single transaction persists the message with `sent` status, overwrites
/// the last-message preview and bumps the receiver's unread counter. Either
/// all three land or none do; a failure cannot leave a persisted message
/// with a stale preview or an unbumped counter.
pub async fn create_message(
    pool: &PgPool,
    sender_id: Uuid,
    request: &SendMessageRequest,
) -> Result<Message, ChatError> {
    if request.content.trim().is_empty() {
        return Err(ChatError::validation("content", "content cannot be empty"));
    }
    if request.receiver_id.is_nil() {
        return Err(ChatError::validation("receiverId", "receiver is required"));
    }

    let conversation = find_or_create_conversation(pool, sender_id, request.receiver_id).await?;

    let message = Message {
        id: Uuid::new_v4(),
        conversation_id: conversation.id,
        sender_id,
        receiver_id: request.receiver_id,
        content: request.content.clone(),
        message_type: request.message_type.unwrap_or(MessageType::Text),
        file_url: request.file_url.clone(),
        file_name: request.file_name.clone(),
        file_size: request.file_size,
        status: MessageStatus::Sent,
        read_at: None,
        is_deleted: false,
        is_edited: false,
        original_content: None,
        created_at: Utc::now(),
    };

    let mut tx = pool.begin().await?;
    db::insert_message(&mut *tx, &message).await?;
    db::update_conversation_preview(&mut *tx, conversation.id, &message).await?;
    db::increment_unread(&mut *tx, conversation.id, request.receiver_id).await?;
    tx.commit().await?;

    tracing::debug!(
        "message {} persisted in conversation {}",
        message.id,
        conversation.id
    );

    Ok(message)
}

/// Load a conversation or fail with `NotFound`
pub async fn get_conversation(
    pool: &PgPool,
    conversation_id: Uuid,
) -> Result<Conversation, ChatError> {
    db::get_conversation_by_id(pool, conversation_id)
        .await?
        .ok_or_else(|| ChatError::not_found("conversation"))
}

/// Fetch the direct conversation for an explicit pair, if it exists
pub async fn get_conversation_for_pair(
    pool: &PgPool,
    user_a: Uuid,
    user_b: Uuid,
) -> Result<Option<Conversation>, ChatError> {
    let (low, high) = canonical_pair(user_a, user_b);
    Ok(db::get_conversation_by_pair(pool, low, high).await?)
}

/// List a user's conversations, newest activity first
pub async fn list_conversations(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<Conversation>, ChatError> {
    Ok(db::get_conversations_for_user(pool, user_id).await?)
}

/// Page through a conversation's messages, oldest first
///
/// Offset pagination is restartable but not a true cursor: concurrent
/// inserts during pagination can shift results. Kept for wire compatibility.
pub async fn get_conversation_messages(
    pool: &PgPool,
    conversation_id: Uuid,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<Vec<Message>, ChatError> {
    // Existence check so a bad id is a 404 rather than an empty page.
    get_conversation(pool, conversation_id).await?;

    let limit = limit.unwrap_or(DEFAULT_MESSAGE_LIMIT).clamp(1, 200);
    let offset = offset.unwrap_or(0).max(0);

    Ok(db::get_messages_for_conversation(pool, conversation_id, limit, offset).await?)
}

/// Mark a single message read on the receiver's behalf
///
/// Returns the updated message, or `None` when the caller is not the
/// receiver: a sender-side "mark read" is an intentional idempotent ignore,
/// not an error. The status guard sits in the UPDATE itself, so of any
/// number of racing calls for the same message exactly one observes the
/// unread → read transition and performs the counter decrement; the rest
/// cannot eat a neighbouring message's count.
pub async fn mark_message_read(
    pool: &PgPool,
    message_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Message>, ChatError> {
    let message = db::get_message_by_id(pool, message_id)
        .await?
        .ok_or_else(|| ChatError::not_found("message"))?;

    if message.receiver_id != user_id {
        return Ok(None);
    }

    if message.status == MessageStatus::Read {
        return Ok(Some(message));
    }

    let read_at = Utc::now();
    let mut tx = pool.begin().await?;
    let transitioned = db::mark_message_read_row(&mut *tx, message_id, read_at).await?;
    if transitioned {
        db::decrement_unread(&mut *tx, message.conversation_id, user_id).await?;
    }
    tx.commit().await?;

    if !transitioned {
        // A concurrent call won the transition; re-read for the actual read_at.
        return Ok(db::get_message_by_id(pool, message_id).await?);
    }

    Ok(Some(Message {
        status: MessageStatus::Read,
        read_at: Some(read_at),
        ..message
    }))
}

/// Mark every unread message addressed to the user in a conversation as read
///
/// This is the "I opened the thread" semantic: the unread counter is reset
/// to exactly 0, not decremented. Returns the transitioned messages so read
/// receipts can be relayed to their senders.
pub async fn mark_conversation_read(
    pool: &PgPool,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<Message>, ChatError> {
    get_conversation(pool, conversation_id).await?;

    let read_at = Utc::now();
    let mut tx = pool.begin().await?;
    let transitioned =
        db::mark_conversation_messages_read(&mut *tx, conversation_id, user_id, read_at).await?;
    db::reset_unread(&mut *tx, conversation_id, user_id).await?;
    tx.commit().await?;

    Ok(transitioned)
}

/// Soft-delete a message; sender only
pub async fn delete_message(
    pool: &PgPool,
    message_id: Uuid,
    user_id: Uuid,
) -> Result<Message, ChatError> {
    let message = db::get_message_by_id(pool, message_id)
        .await?
        .ok_or_else(|| ChatError::not_found("message"))?;

    if message.sender_id != user_id {
        return Err(ChatError::authorization(
            "only the sender can delete a message",
        ));
    }

    let original = message.preserved_original();
    db::set_message_deleted(pool, message_id, DELETED_MESSAGE_PLACEHOLDER, &original)
        .await?
        .ok_or_else(|| ChatError::not_found("message"))
}

/// Edit a message's content; sender only
///
/// `original_content` is captured on the first edit and never overwritten by
/// later edits.
pub async fn edit_message(
    pool: &PgPool,
    message_id: Uuid,
    user_id: Uuid,
    new_content: &str,
) -> Result<Message, ChatError> {
    if new_content.trim().is_empty() {
        return Err(ChatError::validation("content", "content cannot be empty"));
    }

    let message = db::get_message_by_id(pool, message_id)
        .await?
        .ok_or_else(|| ChatError::not_found("message"))?;

    if message.sender_id != user_id {
        return Err(ChatError::authorization(
            "only the sender can edit a message",
        ));
    }

    let original = message.preserved_original();
    db::set_message_edited(pool, message_id, new_content, &original)
        .await?
        .ok_or_else(|| ChatError::not_found("message"))
}

/// Total unread messages for a user across all their conversations
pub async fn get_unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64, ChatError> {
    Ok(db::total_unread_for_user(pool, user_id).await?)
}
