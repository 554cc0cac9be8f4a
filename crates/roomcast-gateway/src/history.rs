//! History log collaborator: durable per-room message storage.
//!
//! The relay treats durability as best-effort: an append failure on the live
//! path is logged and swallowed, and delivery proceeds. The trait is the seam
//! for a real durable backend; the in-memory implementation ships as the
//! default and backs the tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use roomcast_core::error::Result;

/// Persisted form of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub name: String,
    pub text: String,
    pub room: String,
    /// RFC 3339 UTC timestamp.
    pub time: String,
}

/// Append-only message log keyed by room.
#[async_trait]
pub trait HistoryLog: Send + Sync {
    async fn append(&self, entry: StoredMessage) -> Result<()>;

    /// Up to `limit` most recent entries for `room`, oldest first.
    async fn recent(&self, room: &str, limit: usize) -> Result<Vec<StoredMessage>>;
}

/// In-memory history with a per-room retention cap.
pub struct InMemoryHistory {
    rooms: Mutex<HashMap<String, VecDeque<StoredMessage>>>,
    max_room_entries: usize,
}

impl InMemoryHistory {
    pub fn new(max_room_entries: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            max_room_entries,
        }
    }
}

#[async_trait]
impl HistoryLog for InMemoryHistory {
    async fn append(&self, entry: StoredMessage) -> Result<()> {
        let mut rooms = self.rooms.lock().await;
        let log = rooms.entry(entry.room.clone()).or_default();
        log.push_back(entry);
        while log.len() > self.max_room_entries {
            log.pop_front();
        }
        Ok(())
    }

    async fn recent(&self, room: &str, limit: usize) -> Result<Vec<StoredMessage>> {
        let rooms = self.rooms.lock().await;
        let Some(log) = rooms.get(room) else {
            return Ok(Vec::new());
        };
        let skip = log.len().saturating_sub(limit);
        Ok(log.iter().skip(skip).cloned().collect())
    }
}
