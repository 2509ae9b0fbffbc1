use dashmap::DashMap;
use palaver_core::ConnId;
use std::collections::HashSet;

/// Pure membership store: which connection sits in which room. The
/// registry never notifies anyone; broadcasting on membership changes is
/// the router's job.
///
/// All operations are total; there is nothing here that can fail.
#[derive(Default)]
pub struct SessionRegistry {
    rooms: DashMap<String, HashSet<ConnId>>,
    /// Room most recently joined by each connection, used to resolve the
    /// broadcast form of offers and candidates.
    last_joined: DashMap<ConnId, String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `conn` to `room`, creating the room on first join. Idempotent
    /// for a connection that is already a member.
    pub fn join(&self, conn: ConnId, room: &str) {
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(conn.clone());
        self.last_joined.insert(conn, room.to_string());
    }

    /// Remove `conn` from every room it is a member of. Rooms are never
    /// destroyed; an emptied set keeps its name for reuse.
    pub fn leave(&self, conn: &ConnId) {
        for mut entry in self.rooms.iter_mut() {
            entry.value_mut().remove(conn);
        }
        self.last_joined.remove(conn);
    }

    /// Snapshot of the member set, taken under the room's shard lock so a
    /// concurrent join/leave never yields a half-applied view.
    pub fn members_of(&self, room: &str) -> HashSet<ConnId> {
        self.rooms
            .get(room)
            .map(|members| members.clone())
            .unwrap_or_default()
    }

    /// Room most recently joined by `conn`, if it ever joined one.
    pub fn room_of(&self, conn: &ConnId) -> Option<String> {
        self.last_joined.get(conn).map(|room| room.clone())
    }
}
