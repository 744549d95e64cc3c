//! User Directory Adapter
//!
//! The user directory is owned by the accounts service; the chat core only
//! reads profile fields for pushed-message payloads and flips the
//! online/last-seen presence hint on connect/disconnect. Presence is
//! last-writer-wins by design: login/logout flows also touch these columns.

use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::shared::event::SenderProfile;

/// Fetch the lightweight profile attached to pushed messages
pub async fn get_user_profile(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<SenderProfile>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, username, photo_url, is_online
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| SenderProfile {
        id: r.get("id"),
        username: r.get("username"),
        photo_url: r.get("photo_url"),
        is_online: r.get("is_online"),
    }))
}

/// Whether the user exists and their account is active
pub async fn is_user_active(pool: &PgPool, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT is_active FROM users WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.get::<bool, _>("is_active")).unwrap_or(false))
}

/// Update the online flag; records last_seen when a user goes offline
pub async fn set_user_online(
    pool: &PgPool,
    user_id: Uuid,
    is_online: bool,
) -> Result<(), sqlx::Error> {
    if is_online {
        sqlx::query(
            r#"
            UPDATE users SET is_online = TRUE WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(pool)
        .await?;
    } else {
        sqlx::query(
            r#"
            UPDATE users SET is_online = FALSE, last_seen = $1 WHERE id = $2
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;
    }

    Ok(())
}
