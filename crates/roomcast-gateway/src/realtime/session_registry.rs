//! Live connection registry.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;

use super::presence::ConnId;

/// One session's outbound queue sender.
#[derive(Clone)]
pub struct Connection {
    pub tx: mpsc::Sender<Message>,
}

/// Session registry: `ConnId -> Connection`. Connection ids come from an
/// atomic sequence, so an id is never reused within a process lifetime.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<ConnId, Connection>,
    seq: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    /// Register a connection and allocate its id.
    pub fn insert(&self, conn: Connection) -> ConnId {
        let id = self.seq.fetch_add(1, Ordering::Relaxed);
        self.sessions.insert(id, conn);
        id
    }

    pub fn remove(&self, id: ConnId) -> Option<Connection> {
        self.sessions.remove(&id).map(|(_, conn)| conn)
    }

    pub fn get(&self, id: ConnId) -> Option<Connection> {
        self.sessions.get(&id).map(|r| r.value().clone())
    }

    /// Snapshot of every live connection (global broadcast targets).
    pub fn all(&self) -> Vec<Connection> {
        self.sessions.iter().map(|r| r.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> (Connection, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(8);
        (Connection { tx }, rx)
    }

    #[test]
    fn ids_are_unique() {
        let reg = SessionRegistry::new();
        let (a, _ra) = conn();
        let (b, _rb) = conn();
        let ida = reg.insert(a);
        let idb = reg.insert(b);
        assert_ne!(ida, idb);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn remove_forgets_connection() {
        let reg = SessionRegistry::new();
        let (a, _ra) = conn();
        let id = reg.insert(a);
        assert!(reg.get(id).is_some());
        assert!(reg.remove(id).is_some());
        assert!(reg.get(id).is_none());
        assert!(reg.remove(id).is_none());
    }
}
