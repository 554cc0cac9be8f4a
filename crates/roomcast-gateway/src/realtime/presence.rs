//! Presence store: who is connected, and where.
//!
//! Authoritative mapping of live connection -> (username, room), plus the set
//! of recently-departed (username, room) pairs. Every transition goes through
//! a single mutex so `activate`/`deactivate`/`lookup` are linearizable: no
//! interleaving can produce two memberships for one connection, or a
//! membership and an offline marker for the same (username, room) pair.
//!
//! Directory queries are computed fresh under the same lock — there is no
//! cached derived state to go stale. Rosters list distinct usernames; a user
//! holding several connections in one room appears once (the offline marker
//! is only recorded when the last of those connections departs).

use std::collections::{BTreeSet, HashMap, HashSet};

use tokio::sync::Mutex;

use roomcast_core::protocol::{OfflineEntry, Roster, RosterEntry};

/// Connection identifier. Allocated by the session registry and used as the
/// membership key: one membership per live connection.
pub type ConnId = u64;

/// One connection's room membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub conn: ConnId,
    pub name: String,
    pub room: String,
}

#[derive(Default)]
struct PresenceInner {
    memberships: HashMap<ConnId, Membership>,
    /// Recently departed (name, room) pairs. Set semantics.
    offline: HashSet<(String, String)>,
}

/// Lock-guarded presence state. Owned by the relay core and injected into
/// sessions, never reachable as ambient global state.
#[derive(Default)]
pub struct PresenceStore {
    inner: Mutex<PresenceInner>,
}

impl PresenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate `conn` as `name` in `room`.
    ///
    /// Clears any offline marker for (name, room) and replaces any prior
    /// membership for this connection, so calling again with a different room
    /// is a room switch, not an error.
    pub async fn activate(&self, conn: ConnId, name: &str, room: &str) -> Membership {
        let mut inner = self.inner.lock().await;
        inner.offline.remove(&(name.to_string(), room.to_string()));
        let membership = Membership {
            conn,
            name: name.to_string(),
            room: room.to_string(),
        };
        inner.memberships.insert(conn, membership.clone());
        membership
    }

    /// Remove `conn`'s membership. Records an offline marker unless another
    /// connection keeps the same (name, room) pair active, which upholds the
    /// "offline list never contains an online user" invariant under
    /// multi-device use.
    ///
    /// Returns the removed membership, or `None` if the connection never
    /// joined a room.
    pub async fn deactivate(&self, conn: ConnId) -> Option<Membership> {
        let mut inner = self.inner.lock().await;
        let removed = inner.memberships.remove(&conn)?;
        let still_active = inner
            .memberships
            .values()
            .any(|m| m.name == removed.name && m.room == removed.room);
        if !still_active {
            inner
                .offline
                .insert((removed.name.clone(), removed.room.clone()));
        }
        Some(removed)
    }

    pub async fn lookup(&self, conn: ConnId) -> Option<Membership> {
        self.inner.lock().await.memberships.get(&conn).cloned()
    }

    /// Active member names of `room`, deduped and sorted for stable rosters.
    pub async fn members_of(&self, room: &str) -> Vec<String> {
        let inner = self.inner.lock().await;
        let names: BTreeSet<&str> = inner
            .memberships
            .values()
            .filter(|m| m.room == room)
            .map(|m| m.name.as_str())
            .collect();
        names.into_iter().map(String::from).collect()
    }

    /// Recently departed (name, room) pairs for `room`, sorted by name.
    pub async fn offline_of(&self, room: &str) -> Vec<(String, String)> {
        let inner = self.inner.lock().await;
        let mut pairs: Vec<(String, String)> = inner
            .offline
            .iter()
            .filter(|(_, r)| r == room)
            .cloned()
            .collect();
        pairs.sort();
        pairs
    }

    /// Distinct rooms with at least one active membership, sorted.
    pub async fn active_rooms(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        let rooms: BTreeSet<&str> = inner
            .memberships
            .values()
            .map(|m| m.room.as_str())
            .collect();
        rooms.into_iter().map(String::from).collect()
    }

    /// Combined roster snapshot for `room`, taken under one lock acquisition
    /// so the active and offline halves are mutually consistent.
    pub async fn roster(&self, room: &str) -> Roster {
        let inner = self.inner.lock().await;
        let names: BTreeSet<&str> = inner
            .memberships
            .values()
            .filter(|m| m.room == room)
            .map(|m| m.name.as_str())
            .collect();
        let mut offline: Vec<&(String, String)> =
            inner.offline.iter().filter(|(_, r)| r == room).collect();
        offline.sort();
        Roster {
            users: names
                .into_iter()
                .map(|name| RosterEntry { name: name.into() })
                .collect(),
            offline_users: offline
                .into_iter()
                .map(|(name, room)| OfflineEntry {
                    name: name.clone(),
                    room: room.clone(),
                })
                .collect(),
        }
    }

    /// Connection ids of every member of `room`. Recipient snapshot for the
    /// fan-out: computed under the lock, delivered after release.
    pub async fn member_conns(&self, room: &str) -> Vec<ConnId> {
        let inner = self.inner.lock().await;
        inner
            .memberships
            .values()
            .filter(|m| m.room == room)
            .map(|m| m.conn)
            .collect()
    }
}
