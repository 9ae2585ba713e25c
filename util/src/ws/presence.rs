//! In-memory presence registry: which users are connected, and which room
//! each connection is currently viewing.
//!
//! Two keyed maps, one by connection id and one by user id, so both lookup
//! directions are O(1). The maps are sharded (`DashMap`), so registry
//! mutations lock per key, never the registry as a whole. At most one
//! session per user is considered *current* (last registered wins); a
//! superseded session stays in the by-connection map until its own
//! disconnect fires, but it is no longer visible through `lookup`.
//!
//! Presence is process-local by design. Absence is a normal result for every
//! operation here, never an error.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A live connection for one user.
///
/// Created when a socket is admitted, updated when the client joins a room,
/// and removed when the socket closes. `current_room_id` is the only mutable
/// part and is always set through the registry so every reader sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub connection_id: u64,
    pub user_id: i64,
    pub current_room_id: Option<i64>,
    pub connected_at: DateTime<Utc>,
}

impl Session {
    pub fn new(connection_id: u64, user_id: i64) -> Self {
        Self {
            connection_id,
            user_id,
            current_room_id: None,
            connected_at: Utc::now(),
        }
    }
}

/// Concurrency-safe registry of live sessions.
///
/// Cloning is cheap; all clones share the same maps.
#[derive(Clone, Default)]
pub struct PresenceRegistry {
    /// Every live session, keyed by connection id.
    by_connection: Arc<DashMap<u64, Session>>,
    /// The *current* connection per user (last registered wins).
    current: Arc<DashMap<i64, u64>>,
    next_connection_id: Arc<AtomicU64>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a process-unique connection id for a newly admitted socket.
    pub fn next_connection_id(&self) -> u64 {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Registers a session, making it the user's current one.
    ///
    /// A previously registered session for the same user is superseded for
    /// lookups but stays in the by-connection map until its own
    /// `unregister` runs.
    pub fn register(&self, session: Session) {
        self.current.insert(session.user_id, session.connection_id);
        self.by_connection.insert(session.connection_id, session);
    }

    /// Removes the session with the given connection id. No-op if absent.
    ///
    /// Must not evict a newer session registered by the same user: the
    /// current-pointer is only cleared while it still points at this
    /// connection.
    pub fn unregister(&self, connection_id: u64) {
        if let Some((_, session)) = self.by_connection.remove(&connection_id) {
            self.current
                .remove_if(&session.user_id, |_, current| *current == connection_id);
        }
    }

    /// Returns the user's current session, if any.
    pub fn lookup(&self, user_id: i64) -> Option<Session> {
        let connection_id = *self.current.get(&user_id)?;
        self.by_connection
            .get(&connection_id)
            .map(|entry| entry.clone())
    }

    /// Records which room the connection is now viewing.
    ///
    /// Returns `false` if the connection is gone (disconnect raced the join).
    pub fn set_current_room(&self, connection_id: u64, room_id: i64) -> bool {
        match self.by_connection.get_mut(&connection_id) {
            Some(mut session) => {
                session.current_room_id = Some(room_id);
                true
            }
            None => false,
        }
    }

    /// Whether the user's current session is viewing `room_id` right now.
    pub fn is_viewing(&self, user_id: i64, room_id: i64) -> bool {
        match self.lookup(user_id) {
            Some(session) => session.current_room_id == Some(room_id),
            None => false,
        }
    }

    /// Number of live sessions (all connections, current or superseded).
    pub fn connection_count(&self) -> usize {
        self.by_connection.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_registered_session() {
        let registry = PresenceRegistry::new();
        let id = registry.next_connection_id();
        registry.register(Session::new(id, 7));

        let found = registry.lookup(7).unwrap();
        assert_eq!(found.connection_id, id);
        assert_eq!(found.user_id, 7);
        assert_eq!(found.current_room_id, None);
    }

    #[test]
    fn lookup_of_unknown_user_is_none() {
        let registry = PresenceRegistry::new();
        assert!(registry.lookup(999).is_none());
    }

    #[test]
    fn last_registered_session_wins() {
        let registry = PresenceRegistry::new();
        let first = registry.next_connection_id();
        let second = registry.next_connection_id();
        registry.register(Session::new(first, 7));
        registry.register(Session::new(second, 7));

        let found = registry.lookup(7).unwrap();
        assert_eq!(found.connection_id, second);
        // Both connections are still physically present.
        assert_eq!(registry.connection_count(), 2);
    }

    #[test]
    fn stale_disconnect_does_not_evict_newer_session() {
        let registry = PresenceRegistry::new();
        let first = registry.next_connection_id();
        let second = registry.next_connection_id();
        registry.register(Session::new(first, 7));
        registry.register(Session::new(second, 7));

        // The superseded connection disconnects late.
        registry.unregister(first);

        let found = registry.lookup(7).unwrap();
        assert_eq!(found.connection_id, second);
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn unregister_current_session_clears_lookup() {
        let registry = PresenceRegistry::new();
        let id = registry.next_connection_id();
        registry.register(Session::new(id, 7));
        registry.unregister(id);

        assert!(registry.lookup(7).is_none());
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn unregister_unknown_connection_is_noop() {
        let registry = PresenceRegistry::new();
        registry.unregister(12345);
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn set_current_room_tracks_viewing() {
        let registry = PresenceRegistry::new();
        let id = registry.next_connection_id();
        registry.register(Session::new(id, 7));

        assert!(!registry.is_viewing(7, 3));
        assert!(registry.set_current_room(id, 3));
        assert!(registry.is_viewing(7, 3));
        assert!(!registry.is_viewing(7, 4));

        // Switching rooms replaces the old one.
        assert!(registry.set_current_room(id, 4));
        assert!(registry.is_viewing(7, 4));
        assert!(!registry.is_viewing(7, 3));
    }

    #[test]
    fn set_current_room_on_gone_connection_returns_false() {
        let registry = PresenceRegistry::new();
        assert!(!registry.set_current_room(42, 1));
    }

    #[test]
    fn concurrent_connects_from_many_users_do_not_interfere() {
        let registry = PresenceRegistry::new();
        let handles: Vec<_> = (1..=16)
            .map(|user_id| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let id = registry.next_connection_id();
                    registry.register(Session::new(id, user_id));
                    registry.set_current_room(id, user_id * 10);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.connection_count(), 16);
        for user_id in 1..=16 {
            assert!(registry.is_viewing(user_id, user_id * 10));
        }
    }
}
