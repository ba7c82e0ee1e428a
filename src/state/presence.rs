use std::collections::HashSet;

use dashmap::DashMap;
use uuid::Uuid;

/// Connected players per room.
///
/// Display-only bookkeeping: it backs the "is anyone listening" broadcast
/// short-circuit and the connected list in snapshots. It is never
/// consulted for correctness decisions and is not persisted.
#[derive(Debug, Default)]
pub struct PresenceSet {
    rooms: DashMap<Uuid, HashSet<Uuid>>,
}

impl PresenceSet {
    /// Create an empty presence set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a player connected. Returns `false` when they already were.
    pub fn connect(&self, room_id: Uuid, user_id: Uuid) -> bool {
        self.rooms.entry(room_id).or_default().insert(user_id)
    }

    /// Mark a player disconnected. Returns `false` when they were not
    /// tracked as connected.
    pub fn disconnect(&self, room_id: Uuid, user_id: Uuid) -> bool {
        let removed = self
            .rooms
            .get_mut(&room_id)
            .map(|mut users| users.remove(&user_id))
            .unwrap_or(false);
        self.rooms
            .remove_if(&room_id, |_, users| users.is_empty());
        removed
    }

    /// Whether a specific player is currently connected to the room.
    pub fn is_connected(&self, room_id: Uuid, user_id: Uuid) -> bool {
        self.rooms
            .get(&room_id)
            .is_some_and(|users| users.contains(&user_id))
    }

    /// Number of players currently connected to the room.
    pub fn count(&self, room_id: Uuid) -> usize {
        self.rooms.get(&room_id).map(|users| users.len()).unwrap_or(0)
    }

    /// Connected player identities for display purposes.
    pub fn users(&self, room_id: Uuid) -> Vec<Uuid> {
        self.rooms
            .get(&room_id)
            .map(|users| users.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_and_disconnect_round_trip() {
        let presence = PresenceSet::new();
        let room = Uuid::new_v4();
        let user = Uuid::new_v4();

        assert!(presence.connect(room, user));
        assert!(!presence.connect(room, user));
        assert!(presence.is_connected(room, user));
        assert_eq!(presence.count(room), 1);

        assert!(presence.disconnect(room, user));
        assert!(!presence.disconnect(room, user));
        assert_eq!(presence.count(room), 0);
    }

    #[test]
    fn rooms_are_independent() {
        let presence = PresenceSet::new();
        let room_a = Uuid::new_v4();
        let room_b = Uuid::new_v4();
        let user = Uuid::new_v4();

        presence.connect(room_a, user);
        assert!(!presence.is_connected(room_b, user));
        assert_eq!(presence.count(room_b), 0);
    }
}
