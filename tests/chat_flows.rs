//! Service-layer integration tests
//!
//! Exercises the conversation/message lifecycle against a real PostgreSQL
//! instance: pairing uniqueness under concurrency, unread-count bookkeeping,
//! read transitions, and sender-only edit/delete ownership.
//!
//! All tests are `#[ignore]` because they need a reachable database; run
//! them with `DATABASE_URL=... cargo test -- --ignored`.

mod common;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use uuid::Uuid;

use motorlink::backend::chat::service;
use motorlink::shared::chat::message::{
    MessageStatus, SendMessageRequest, DELETED_MESSAGE_PLACEHOLDER,
};
use motorlink::shared::error::ChatError;

use common::TestDatabase;

fn text_request(receiver_id: Uuid, content: &str) -> SendMessageRequest {
    SendMessageRequest {
        receiver_id,
        content: content.to_string(),
        message_type: None,
        file_url: None,
        file_name: None,
        file_size: None,
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn pairing_uniqueness_under_concurrent_creation() {
    let db = TestDatabase::new().await;
    let a = db.create_user("alice").await;
    let b = db.create_user("bob").await;

    // Hammer both argument orders concurrently; exactly one conversation
    // may exist afterwards.
    let mut handles = Vec::new();
    for i in 0..8 {
        let pool = db.pool().clone();
        let (x, y) = if i % 2 == 0 { (a, b) } else { (b, a) };
        handles.push(tokio::spawn(async move {
            service::find_or_create_conversation(&pool, x, y)
                .await
                .expect("find_or_create failed")
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 1, "concurrent creation produced duplicates");
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn first_message_creates_conversation_with_preview_and_unread() {
    let db = TestDatabase::new().await;
    let u1 = db.create_user("u1").await;
    let u2 = db.create_user("u2").await;

    let message = service::create_message(db.pool(), u1, &text_request(u2, "hello"))
        .await
        .unwrap();
    assert_eq!(message.content, "hello");
    assert_eq!(message.status, MessageStatus::Sent);

    let conversation = service::get_conversation(db.pool(), message.conversation_id)
        .await
        .unwrap();
    assert!(conversation.participants[0] <= conversation.participants[1]);
    assert!(conversation.is_participant(u1));
    assert!(conversation.is_participant(u2));
    assert_eq!(conversation.unread_for(u2), 1);
    assert_eq!(conversation.unread_for(u1), 0);
    assert_eq!(conversation.last_message_content.as_deref(), Some("hello"));
    assert_eq!(conversation.last_message_sender, Some(u1));
    assert_eq!(conversation.last_message, Some(message.id));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn unread_count_increases_by_exactly_n_under_concurrent_sends() {
    let db = TestDatabase::new().await;
    let a = db.create_user("receiver").await;
    let b = db.create_user("sender").await;

    const N: usize = 10;
    let mut handles = Vec::new();
    for i in 0..N {
        let pool = db.pool().clone();
        handles.push(tokio::spawn(async move {
            service::create_message(&pool, b, &text_request(a, &format!("msg {i}")))
                .await
                .expect("send failed")
        }));
    }
    let mut conversation_id = None;
    for handle in handles {
        conversation_id = Some(handle.await.unwrap().conversation_id);
    }

    let conversation = service::get_conversation(db.pool(), conversation_id.unwrap())
        .await
        .unwrap();
    assert_eq!(conversation.unread_for(a), N as i64);
    assert_eq!(service::get_unread_count(db.pool(), a).await.unwrap(), N as i64);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn mark_conversation_read_resets_counter_and_transitions_messages() {
    let db = TestDatabase::new().await;
    let a = db.create_user("reader").await;
    let b = db.create_user("writer").await;

    for i in 0..3 {
        service::create_message(db.pool(), b, &text_request(a, &format!("m{i}")))
            .await
            .unwrap();
    }
    let conversation = service::get_conversation_for_pair(db.pool(), a, b)
        .await
        .unwrap()
        .unwrap();

    let transitioned = service::mark_conversation_read(db.pool(), conversation.id, a)
        .await
        .unwrap();
    assert_eq!(transitioned.len(), 3);
    for message in &transitioned {
        assert_eq!(message.status, MessageStatus::Read);
        assert!(message.read_at.is_some());
    }

    let refreshed = service::get_conversation(db.pool(), conversation.id)
        .await
        .unwrap();
    assert_eq!(refreshed.unread_for(a), 0);
    assert_eq!(service::get_unread_count(db.pool(), a).await.unwrap(), 0);

    // Re-reading an already-read conversation transitions nothing.
    let again = service::mark_conversation_read(db.pool(), conversation.id, a)
        .await
        .unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn mark_message_read_is_receiver_only_and_floors_at_zero() {
    let db = TestDatabase::new().await;
    let a = db.create_user("a").await;
    let b = db.create_user("b").await;

    let message = service::create_message(db.pool(), a, &text_request(b, "ping"))
        .await
        .unwrap();

    // Sender-side mark-read is a silent no-op, not an error.
    let ignored = service::mark_message_read(db.pool(), message.id, a)
        .await
        .unwrap();
    assert!(ignored.is_none());

    let updated = service::mark_message_read(db.pool(), message.id, b)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, MessageStatus::Read);
    assert!(updated.read_at.is_some());

    // Marking the same message read again must not drive the counter negative
    // or steal another message's count.
    service::mark_message_read(db.pool(), message.id, b)
        .await
        .unwrap();
    let conversation = service::get_conversation(db.pool(), message.conversation_id)
        .await
        .unwrap();
    assert_eq!(conversation.unread_for(b), 0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn concurrent_reads_of_one_message_decrement_exactly_once() {
    let db = TestDatabase::new().await;
    let a = db.create_user("racer-a").await;
    let b = db.create_user("racer-b").await;

    // Two unread messages; the second one's count is the canary.
    let first = service::create_message(db.pool(), b, &text_request(a, "one"))
        .await
        .unwrap();
    service::create_message(db.pool(), b, &text_request(a, "two"))
        .await
        .unwrap();

    // Hammer the same message from several tasks at once; only one of them
    // may own the unread -> read transition and its decrement.
    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = db.pool().clone();
        handles.push(tokio::spawn(async move {
            service::mark_message_read(&pool, first.id, a)
                .await
                .expect("mark read failed")
        }));
    }
    for handle in handles {
        let message = handle.await.unwrap().unwrap();
        assert_eq!(message.status, MessageStatus::Read);
    }

    let conversation = service::get_conversation(db.pool(), first.conversation_id)
        .await
        .unwrap();
    assert_eq!(conversation.unread_for(a), 1, "second message's count was eaten");
    assert_eq!(service::get_unread_count(db.pool(), a).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn delete_is_sender_only_and_preserves_original() {
    let db = TestDatabase::new().await;
    let u1 = db.create_user("owner").await;
    let u2 = db.create_user("other").await;

    let message = service::create_message(db.pool(), u1, &text_request(u2, "secret plans"))
        .await
        .unwrap();

    let forbidden = service::delete_message(db.pool(), message.id, u2).await;
    assert_matches!(forbidden, Err(ChatError::Authorization { .. }));

    // The failed attempt left the message untouched.
    let unchanged = service::get_conversation_messages(
        db.pool(),
        message.conversation_id,
        None,
        None,
    )
    .await
    .unwrap();
    assert_eq!(unchanged[0].content, "secret plans");
    assert!(!unchanged[0].is_deleted);

    let deleted = service::delete_message(db.pool(), message.id, u1)
        .await
        .unwrap();
    assert!(deleted.is_deleted);
    assert_eq!(deleted.content, DELETED_MESSAGE_PLACEHOLDER);
    assert_eq!(deleted.original_content.as_deref(), Some("secret plans"));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn edit_preserves_original_only_once() {
    let db = TestDatabase::new().await;
    let u1 = db.create_user("editor").await;
    let u2 = db.create_user("reader").await;

    let message = service::create_message(db.pool(), u1, &text_request(u2, "first draft"))
        .await
        .unwrap();

    let edited = service::edit_message(db.pool(), message.id, u1, "second draft")
        .await
        .unwrap();
    assert!(edited.is_edited);
    assert_eq!(edited.content, "second draft");
    assert_eq!(edited.original_content.as_deref(), Some("first draft"));

    let edited_again = service::edit_message(db.pool(), message.id, u1, "third draft")
        .await
        .unwrap();
    assert_eq!(edited_again.content, "third draft");
    // Original stays at the pre-first-edit content.
    assert_eq!(edited_again.original_content.as_deref(), Some("first draft"));

    let not_owner = service::edit_message(db.pool(), message.id, u2, "hijacked").await;
    assert_matches!(not_owner, Err(ChatError::Authorization { .. }));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn messages_come_back_oldest_first_with_pagination() {
    let db = TestDatabase::new().await;
    let a = db.create_user("pager-a").await;
    let b = db.create_user("pager-b").await;

    for i in 0..5 {
        service::create_message(db.pool(), a, &text_request(b, &format!("n{i}")))
            .await
            .unwrap();
    }
    let conversation = service::get_conversation_for_pair(db.pool(), a, b)
        .await
        .unwrap()
        .unwrap();

    let all = service::get_conversation_messages(db.pool(), conversation.id, None, None)
        .await
        .unwrap();
    assert_eq!(all.len(), 5);
    for window in all.windows(2) {
        assert!(window[0].created_at <= window[1].created_at);
    }

    let page = service::get_conversation_messages(db.pool(), conversation.id, Some(2), Some(2))
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, all[2].id);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn missing_entities_surface_not_found() {
    let db = TestDatabase::new().await;
    let user = db.create_user("loner").await;

    let no_conversation =
        service::get_conversation_messages(db.pool(), Uuid::new_v4(), None, None).await;
    assert_matches!(no_conversation, Err(ChatError::NotFound { .. }));

    let no_message = service::mark_message_read(db.pool(), Uuid::new_v4(), user).await;
    assert_matches!(no_message, Err(ChatError::NotFound { .. }));

    let no_delete = service::delete_message(db.pool(), Uuid::new_v4(), user).await;
    assert_matches!(no_delete, Err(ChatError::NotFound { .. }));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn validation_rejects_empty_content_before_persistence() {
    let db = TestDatabase::new().await;
    let a = db.create_user("v-a").await;
    let b = db.create_user("v-b").await;

    let result = service::create_message(db.pool(), a, &text_request(b, "   ")).await;
    assert_matches!(result, Err(ChatError::Validation { .. }));

    // Nothing was created for the pair.
    let conversation = service::get_conversation_for_pair(db.pool(), a, b)
        .await
        .unwrap();
    assert!(conversation.is_none());
}
