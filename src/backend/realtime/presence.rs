//! Presence Broadcasting
//!
//! `user:online` / `user:offline` events fan out to every connected client
//! over a `tokio::sync::broadcast` channel. Each socket task subscribes on
//! connect and filters out events about its own user, so a presence change
//! reaches all *other* clients.

use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::shared::event::ServerEvent;

/// Broadcast channel carrying presence events to all socket tasks
pub type PresenceBroadcast = broadcast::Sender<ServerEvent>;

/// Channel capacity; presence traffic is light, this is generous
pub const PRESENCE_CHANNEL_CAPACITY: usize = 1000;

/// Create the presence broadcast channel
pub fn presence_channel() -> PresenceBroadcast {
    broadcast::channel(PRESENCE_CHANNEL_CAPACITY).0
}

/// Broadcast a presence transition for a user
///
/// Returns the number of subscribers that received the event; zero
/// subscribers is not an error.
pub fn broadcast_presence(tx: &PresenceBroadcast, user_id: Uuid, online: bool) -> usize {
    let event = if online {
        ServerEvent::UserOnline {
            user_id,
            timestamp: Utc::now(),
        }
    } else {
        ServerEvent::UserOffline {
            user_id,
            timestamp: Utc::now(),
        }
    };

    match tx.send(event) {
        Ok(subscriber_count) => {
            tracing::debug!(
                "[Presence] user {} {} broadcast to {} subscribers",
                user_id,
                if online { "online" } else { "offline" },
                subscriber_count
            );
            subscriber_count
        }
        Err(_) => {
            // No subscribers, that's okay
            tracing::debug!("[Presence] no subscribers for presence event");
            0
        }
    }
}
