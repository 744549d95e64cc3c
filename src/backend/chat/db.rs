//! Database operations for conversations and messages
//!
//! All unread-counter mutations here are single atomic SQL statements
//! (`count = count + 1`, `GREATEST(count - 1, 0)`, reset to 0) so concurrent
//! sends and reads never lose updates. Counter rows are sparse: an absent
//! (conversation, user) row reads as 0 and is created on first increment.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, Row};
use uuid::Uuid;

use crate::shared::chat::conversation::Conversation;
use crate::shared::chat::message::{Message, MessageStatus, MessageType};

/// Whether an sqlx error is a uniqueness-constraint violation
///
/// Used by the service to turn a lost conversation-creation race into a
/// re-read instead of an error.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

fn conversation_from_row(row: &PgRow, unread_counts: HashMap<Uuid, i64>) -> Conversation {
    Conversation {
        id: row.get("id"),
        participants: [row.get("participant_low"), row.get("participant_high")],
        is_group_chat: row.get("is_group_chat"),
        last_message: row.get("last_message_id"),
        last_message_content: row.get("last_message_content"),
        last_message_time: row.get("last_message_time"),
        last_message_sender: row.get("last_message_sender"),
        unread_counts,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn message_from_row(row: &PgRow) -> Message {
    Message {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        content: row.get("content"),
        message_type: MessageType::from_str(row.get::<String, _>("message_type").as_str()),
        file_url: row.get("file_url"),
        file_name: row.get("file_name"),
        file_size: row.get("file_size"),
        status: MessageStatus::from_str(row.get::<String, _>("status").as_str()),
        read_at: row.get("read_at"),
        is_deleted: row.get("is_deleted"),
        is_edited: row.get("is_edited"),
        original_content: row.get("original_content"),
        created_at: row.get("created_at"),
    }
}

const CONVERSATION_COLUMNS: &str = "id, participant_low, participant_high, is_group_chat, \
     last_message_id, last_message_content, last_message_time, last_message_sender, \
     is_active, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, receiver_id, content, \
     message_type, file_url, file_name, file_size, status, read_at, is_deleted, is_edited, \
     original_content, created_at";

/// Load the sparse unread counters for a conversation
pub async fn unread_counts_for_conversation(
    pool: &PgPool,
    conversation_id: Uuid,
) -> Result<HashMap<Uuid, i64>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT user_id, count FROM conversation_unreads WHERE conversation_id = $1
        "#,
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| (r.get::<Uuid, _>("user_id"), r.get::<i64, _>("count")))
        .collect())
}

/// Insert a new direct conversation for a canonical pair
///
/// Fails with a unique violation if a concurrent caller created the pair's
/// conversation first; the service treats that as "someone else won".
pub async fn insert_conversation(
    pool: &PgPool,
    participant_low: Uuid,
    participant_high: Uuid,
) -> Result<Conversation, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO conversations (id, participant_low, participant_high, is_group_chat,
                                   is_active, created_at, updated_at)
        VALUES ($1, $2, $3, FALSE, TRUE, $4, $4)
        RETURNING {CONVERSATION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(participant_low)
    .bind(participant_high)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(conversation_from_row(&row, HashMap::new()))
}

/// Look up the direct conversation for a canonical pair
pub async fn get_conversation_by_pair(
    pool: &PgPool,
    participant_low: Uuid,
    participant_high: Uuid,
) -> Result<Option<Conversation>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {CONVERSATION_COLUMNS}
        FROM conversations
        WHERE participant_low = $1 AND participant_high = $2 AND is_group_chat = FALSE
        "#
    ))
    .bind(participant_low)
    .bind(participant_high)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let unreads = unread_counts_for_conversation(pool, row.get("id")).await?;
            Ok(Some(conversation_from_row(&row, unreads)))
        }
        None => Ok(None),
    }
}

/// Load a conversation by id
pub async fn get_conversation_by_id(
    pool: &PgPool,
    conversation_id: Uuid,
) -> Result<Option<Conversation>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1
        "#
    ))
    .bind(conversation_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let unreads = unread_counts_for_conversation(pool, conversation_id).await?;
            Ok(Some(conversation_from_row(&row, unreads)))
        }
        None => Ok(None),
    }
}

/// List a user's conversations, newest activity first
pub async fn get_conversations_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<Conversation>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {CONVERSATION_COLUMNS}
        FROM conversations
        WHERE (participant_low = $1 OR participant_high = $1) AND is_active = TRUE
        ORDER BY updated_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut conversations = Vec::with_capacity(rows.len());
    for row in rows {
        let unreads = unread_counts_for_conversation(pool, row.get("id")).await?;
        conversations.push(conversation_from_row(&row, unreads));
    }

    Ok(conversations)
}

/// Persist a new message
///
/// Takes an executor so message creation can run inside one transaction
/// together with the preview and counter updates.
pub async fn insert_message(
    executor: impl PgExecutor<'_>,
    message: &Message,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO messages (id, conversation_id, sender_id, receiver_id, content,
                              message_type, file_url, file_name, file_size, status,
                              read_at, is_deleted, is_edited, original_content, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
    )
    .bind(message.id)
    .bind(message.conversation_id)
    .bind(message.sender_id)
    .bind(message.receiver_id)
    .bind(&message.content)
    .bind(message.message_type.as_str())
    .bind(&message.file_url)
    .bind(&message.file_name)
    .bind(message.file_size)
    .bind(message.status.as_str())
    .bind(message.read_at)
    .bind(message.is_deleted)
    .bind(message.is_edited)
    .bind(&message.original_content)
    .bind(message.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Load a message by id
pub async fn get_message_by_id(
    pool: &PgPool,
    message_id: Uuid,
) -> Result<Option<Message>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1
        "#
    ))
    .bind(message_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| message_from_row(&r)))
}

/// Page through a conversation's messages, oldest first
pub async fn get_messages_for_conversation(
    pool: &PgPool,
    conversation_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Message>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {MESSAGE_COLUMNS}
        FROM messages
        WHERE conversation_id = $1
        ORDER BY created_at ASC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(conversation_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(message_from_row).collect())
}

/// Overwrite the conversation's denormalized last-message preview
pub async fn update_conversation_preview(
    executor: impl PgExecutor<'_>,
    conversation_id: Uuid,
    message: &Message,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE conversations
        SET last_message_id = $1,
            last_message_content = $2,
            last_message_time = $3,
            last_message_sender = $4,
            updated_at = $3
        WHERE id = $5
        "#,
    )
    .bind(message.id)
    .bind(&message.content)
    .bind(message.created_at)
    .bind(message.sender_id)
    .bind(conversation_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Atomically increment a participant's unread counter by 1
///
/// Creates the counter row on first increment; the increment itself happens
/// store-side, never as application-level read-modify-write.
pub async fn increment_unread(
    executor: impl PgExecutor<'_>,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO conversation_unreads (conversation_id, user_id, count)
        VALUES ($1, $2, 1)
        ON CONFLICT (conversation_id, user_id)
        DO UPDATE SET count = conversation_unreads.count + 1
        "#,
    )
    .bind(conversation_id)
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Atomically decrement a participant's unread counter, floored at 0
pub async fn decrement_unread(
    executor: impl PgExecutor<'_>,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE conversation_unreads
        SET count = GREATEST(count - 1, 0)
        WHERE conversation_id = $1 AND user_id = $2
        "#,
    )
    .bind(conversation_id)
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Reset a participant's unread counter to exactly 0
pub async fn reset_unread(
    executor: impl PgExecutor<'_>,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO conversation_unreads (conversation_id, user_id, count)
        VALUES ($1, $2, 0)
        ON CONFLICT (conversation_id, user_id)
        DO UPDATE SET count = 0
        "#,
    )
    .bind(conversation_id)
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Sum a user's unread counters across every conversation they belong to
pub async fn total_unread_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COALESCE(SUM(u.count), 0)::BIGINT AS total
        FROM conversation_unreads u
        INNER JOIN conversations c ON c.id = u.conversation_id
        WHERE u.user_id = $1
          AND (c.participant_low = $1 OR c.participant_high = $1)
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(row.get::<i64, _>("total"))
}

/// Transition a single message to read, unless it already is
///
/// The status guard lives in the statement itself so two racing mark-read
/// calls cannot both observe an unread row; exactly one caller sees an
/// affected row and owns the accompanying counter decrement.
pub async fn mark_message_read_row(
    executor: impl PgExecutor<'_>,
    message_id: Uuid,
    read_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE messages
        SET status = 'read', read_at = $1
        WHERE id = $2 AND status <> 'read'
        "#,
    )
    .bind(read_at)
    .bind(message_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Bulk-transition a user's unread messages in a conversation to read
///
/// Returns the transitioned messages so read receipts can be relayed to
/// their senders.
pub async fn mark_conversation_messages_read(
    executor: impl PgExecutor<'_>,
    conversation_id: Uuid,
    user_id: Uuid,
    read_at: DateTime<Utc>,
) -> Result<Vec<Message>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        UPDATE messages
        SET status = 'read', read_at = $1
        WHERE conversation_id = $2 AND receiver_id = $3 AND status <> 'read'
        RETURNING {MESSAGE_COLUMNS}
        "#
    ))
    .bind(read_at)
    .bind(conversation_id)
    .bind(user_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.iter().map(message_from_row).collect())
}

/// Soft-delete a message, preserving the original content
pub async fn set_message_deleted(
    pool: &PgPool,
    message_id: Uuid,
    placeholder: &str,
    original_content: &str,
) -> Result<Option<Message>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE messages
        SET is_deleted = TRUE, content = $1, original_content = $2
        WHERE id = $3
        RETURNING {MESSAGE_COLUMNS}
        "#
    ))
    .bind(placeholder)
    .bind(original_content)
    .bind(message_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| message_from_row(&r)))
}

/// Apply an edit, preserving the pre-first-edit content
pub async fn set_message_edited(
    pool: &PgPool,
    message_id: Uuid,
    new_content: &str,
    original_content: &str,
) -> Result<Option<Message>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE messages
        SET is_edited = TRUE, content = $1, original_content = $2
        WHERE id = $3
        RETURNING {MESSAGE_COLUMNS}
        "#
    ))
    .bind(new_content)
    .bind(original_content)
    .bind(message_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| message_from_row(&r)))
}
