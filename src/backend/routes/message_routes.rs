//! Messaging HTTP Handlers
//!
//! REST surface of the chat core, all under `/api` and behind the bearer
//! middleware. Persistence-bearing state changes (send, read, edit, delete)
//! live here; ephemeral state (typing, presence) is socket-only.
//!
//! Handlers that persist something also nudge the realtime layer: a send
//! pushes `message:receive` to the receiver's live connection, a read
//! relays `message:read` to the original sender. Both are fire-and-forget;
//! the REST response is the caller's acknowledgment.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::chat::service;
use crate::backend::middleware::auth::AuthUser;
use crate::backend::realtime::gateway::{deliver_new_message, relay_read_receipt};
use crate::backend::server::state::AppState;
use crate::shared::chat::conversation::Conversation;
use crate::shared::chat::message::{EditMessageRequest, Message, SendMessageRequest};
use crate::shared::error::ChatError;

/// Create a message (POST /api/messages)
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ChatError> {
    let message = service::create_message(&state.db_pool, user.user_id, &request).await?;
    deliver_new_message(&state, &message).await;
    Ok((StatusCode::CREATED, Json(message)))
}

/// List the caller's conversations, newest activity first
/// (GET /api/messages/conversations)
pub async fn list_conversations(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Conversation>>, ChatError> {
    let conversations = service::list_conversations(&state.db_pool, user.user_id).await?;
    Ok(Json(conversations))
}

/// Query parameters for the by-participants lookup
#[derive(Debug, Deserialize)]
pub struct ByParticipantsParams {
    /// Comma-separated pair of user ids
    pub participants: String,
}

/// Fetch the conversation for an explicit pair
/// (GET /api/messages/conversations/by-participants?participants=a,b)
///
/// The caller must be one of the pair.
pub async fn conversation_by_participants(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<ByParticipantsParams>,
) -> Result<Json<Conversation>, ChatError> {
    let mut ids = params.participants.split(',').map(|s| s.trim());
    let (first, second) = match (ids.next(), ids.next(), ids.next()) {
        (Some(a), Some(b), None) => (a, b),
        _ => {
            return Err(ChatError::validation(
                "participants",
                "expected exactly two comma-separated user ids",
            ))
        }
    };

    let user_a = Uuid::parse_str(first)
        .map_err(|_| ChatError::validation("participants", "invalid user id"))?;
    let user_b = Uuid::parse_str(second)
        .map_err(|_| ChatError::validation("participants", "invalid user id"))?;

    if user.user_id != user_a && user.user_id != user_b {
        return Err(ChatError::authorization(
            "caller must be one of the participants",
        ));
    }

    let conversation = service::get_conversation_for_pair(&state.db_pool, user_a, user_b)
        .await?
        .ok_or_else(|| ChatError::not_found("conversation"))?;

    Ok(Json(conversation))
}

/// Query parameters for listing messages
#[derive(Debug, Deserialize)]
pub struct ListMessagesParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Paginated messages, oldest first
/// (GET /api/messages/conversations/{id}?limit=&offset=)
pub async fn conversation_messages(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<Uuid>,
    Query(params): Query<ListMessagesParams>,
) -> Result<Json<Vec<Message>>, ChatError> {
    let conversation = service::get_conversation(&state.db_pool, conversation_id).await?;
    if !conversation.is_participant(user.user_id) {
        return Err(ChatError::authorization(
            "caller is not a participant in this conversation",
        ));
    }

    let messages = service::get_conversation_messages(
        &state.db_pool,
        conversation_id,
        params.limit,
        params.offset,
    )
    .await?;

    Ok(Json(messages))
}

/// Mark one message read (PATCH /api/messages/{id}/read)
pub async fn mark_message_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(message_id): Path<Uuid>,
) -> Result<StatusCode, ChatError> {
    if let Some(message) =
        service::mark_message_read(&state.db_pool, message_id, user.user_id).await?
    {
        relay_read_receipt(&state, &message);
    }
    Ok(StatusCode::OK)
}

/// Response body for the bulk-read endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReadResponse {
    pub messages_read: usize,
}

/// Mark an entire conversation read
/// (PATCH /api/messages/conversations/{id}/read)
pub async fn mark_conversation_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<ConversationReadResponse>, ChatError> {
    let transitioned =
        service::mark_conversation_read(&state.db_pool, conversation_id, user.user_id).await?;

    for message in &transitioned {
        relay_read_receipt(&state, message);
    }

    Ok(Json(ConversationReadResponse {
        messages_read: transitioned.len(),
    }))
}

/// Soft-delete a message, sender only (DELETE /api/messages/{id})
pub async fn delete_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(message_id): Path<Uuid>,
) -> Result<Json<Message>, ChatError> {
    let message = service::delete_message(&state.db_pool, message_id, user.user_id).await?;
    Ok(Json(message))
}

/// Edit a message, sender only (PATCH /api/messages/{id})
pub async fn edit_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(message_id): Path<Uuid>,
    Json(request): Json<EditMessageRequest>,
) -> Result<Json<Message>, ChatError> {
    let message =
        service::edit_message(&state.db_pool, message_id, user.user_id, &request.content).await?;
    Ok(Json(message))
}

/// Response body for the unread-count endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

/// Total unread across all conversations (GET /api/messages/unread-count)
pub async fn unread_count(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UnreadCountResponse>, ChatError> {
    let unread_count = service::get_unread_count(&state.db_pool, user.user_id).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}
