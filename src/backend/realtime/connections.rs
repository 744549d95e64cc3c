//! Live-Connection Registry
//!
//! One authoritative mapping from user id to active connection, readable and
//! writable from many concurrent handlers. The map lives behind a mutex;
//! handlers never touch it unsynchronized.
//!
//! # Semantics
//!
//! - One entry per user: a reconnect overwrites the previous entry
//!   (last-connection-wins; a user with two open tabs loses delivery to the
//!   older tab).
//! - Deregistration is conditional on the connection id, so a slow disconnect
//!   for an old socket cannot evict the newer socket that replaced it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::shared::event::ServerEvent;

/// Handle to one live, authenticated connection
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Identity of the underlying socket; used for conditional removal
    pub connection_id: Uuid,
    /// Outbound event queue consumed by the socket's write half
    pub sender: mpsc::UnboundedSender<ServerEvent>,
}

/// Concurrency-safe user → connection map
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<HashMap<Uuid, ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a user, returning any evicted predecessor
    pub fn register(&self, user_id: Uuid, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let mut map = self.inner.lock().expect("connection registry poisoned");
        map.insert(user_id, handle)
    }

    /// Remove the user's entry only if it still belongs to this connection
    ///
    /// Returns true if the entry was removed. A disconnect racing a
    /// reconnect finds a different connection id and leaves the new entry
    /// alone.
    pub fn deregister(&self, user_id: Uuid, connection_id: Uuid) -> bool {
        let mut map = self.inner.lock().expect("connection registry poisoned");
        match map.get(&user_id) {
            Some(handle) if handle.connection_id == connection_id => {
                map.remove(&user_id);
                true
            }
            _ => false,
        }
    }

    /// Push an event to a user's live connection, if any
    ///
    /// Returns true if the user had a registered connection and the event
    /// was queued. A closed channel counts as no delivery.
    pub fn send_to(&self, user_id: Uuid, event: ServerEvent) -> bool {
        let map = self.inner.lock().expect("connection registry poisoned");
        match map.get(&user_id) {
            Some(handle) => handle.sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Whether the user currently has a live connection
    pub fn is_connected(&self, user_id: Uuid) -> bool {
        self.inner
            .lock()
            .expect("connection registry poisoned")
            .contains_key(&user_id)
    }

    /// Number of live connections (for logging)
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("connection registry poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn handle() -> (ConnectionHandle, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ConnectionHandle {
                connection_id: Uuid::new_v4(),
                sender: tx,
            },
            rx,
        )
    }

    fn typing_event() -> ServerEvent {
        ServerEvent::TypingStart {
            user_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_register_and_send() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (h, mut rx) = handle();

        assert!(registry.register(user, h).is_none());
        assert!(registry.send_to(user, typing_event()));
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_send_to_unknown_user_is_false() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.send_to(Uuid::new_v4(), typing_event()));
    }

    #[tokio::test]
    async fn test_last_connection_wins() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (old, mut old_rx) = handle();
        let (new, mut new_rx) = handle();

        registry.register(user, old.clone());
        let evicted = registry.register(user, new);
        assert_eq!(evicted.unwrap().connection_id, old.connection_id);

        // Delivery goes to the newer connection only.
        registry.send_to(user, typing_event());
        assert!(new_rx.recv().await.is_some());
        assert!(old_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deregister_requires_matching_connection() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (old, _old_rx) = handle();
        let (new, _new_rx) = handle();
        let old_id = old.connection_id;

        registry.register(user, old);
        registry.register(user, new);

        // The old socket's late disconnect must not evict the new entry.
        assert!(!registry.deregister(user, old_id));
        assert!(registry.is_connected(user));
    }

    #[tokio::test]
    async fn test_deregister_removes_current_connection() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (h, _rx) = handle();
        let connection_id = h.connection_id;

        registry.register(user, h);
        assert!(registry.deregister(user, connection_id));
        assert!(!registry.is_connected(user));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_send_to_closed_channel_counts_as_no_delivery() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (h, rx) = handle();
        registry.register(user, h);
        drop(rx);

        let event = ServerEvent::UserOffline {
            user_id: user,
            timestamp: Utc::now(),
        };
        assert!(!registry.send_to(user, event));
    }
}
