//! Per-connection session handler.
//!
//! One `Session` per live connection, driven sequentially by that
//! connection's transport task. The sequential drive is what gives
//! per-connection ordering: `disconnect` can never run while an
//! `enter_room` or `message` for the same connection is in flight.
//!
//! Ordering discipline for every membership change: mutate the presence
//! store first, then compute recipient/roster snapshots, then deliver.
//! Every roster a recipient sees therefore reflects the committed state.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use roomcast_core::protocol::{ChatMessage, DeliveryStatus, ServerEvent};

use crate::history::{HistoryLog, StoredMessage};
use crate::obs::RelayMetrics;

use super::fanout::{Outgoing, RelayCore};
use super::presence::ConnId;

/// Author name for relay-generated notices (welcome, joined, left).
pub const SYSTEM_NAME: &str = "Admin";

/// Immutable metadata for a connected session.
#[derive(Debug, Clone)]
pub struct SessionMeta {
    pub conn: ConnId,
    pub username: String,
}

/// One connection's relay-side state machine.
pub struct Session {
    meta: SessionMeta,
    relay: Arc<RelayCore>,
    history: Arc<dyn HistoryLog>,
    metrics: Arc<RelayMetrics>,
    replay_limit: usize,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn system_message(text: String) -> ServerEvent {
    ServerEvent::Message(ChatMessage {
        id: Uuid::new_v4().to_string(),
        name: SYSTEM_NAME.to_string(),
        text,
        time: now_rfc3339(),
        status: None,
    })
}

impl Session {
    pub fn new(
        meta: SessionMeta,
        relay: Arc<RelayCore>,
        history: Arc<dyn HistoryLog>,
        metrics: Arc<RelayMetrics>,
        replay_limit: usize,
    ) -> Self {
        Self {
            meta,
            relay,
            history,
            metrics,
            replay_limit,
        }
    }

    pub fn conn(&self) -> ConnId {
        self.meta.conn
    }

    pub fn username(&self) -> &str {
        &self.meta.username
    }

    /// Greet the freshly connected client, unicast only.
    pub async fn welcome(&self) {
        let notice = system_message(format!("Welcome {}!", self.meta.username));
        let _ = self.relay.unicast(self.meta.conn, Outgoing::reliable(notice)).await;
    }

    /// Join `room`, leaving the current room if it differs.
    pub async fn enter_room(&self, room: &str) {
        let room = room.trim();
        if room.is_empty() {
            tracing::debug!(conn = self.meta.conn, "enter_room with empty room dropped");
            return;
        }

        let prev = self.relay.presence.lookup(self.meta.conn).await;
        self.relay
            .presence
            .activate(self.meta.conn, &self.meta.username, room)
            .await;

        // The membership mutation is committed; everything below is snapshot
        // plus delivery.
        if let Some(prev) = prev.filter(|p| p.room != room) {
            let notice = system_message(format!("{} left the room", self.meta.username));
            let _ = self.relay.room_all(&prev.room, Outgoing::reliable(notice)).await;
            let roster = self.relay.presence.roster(&prev.room).await;
            let _ = self
                .relay
                .room_all(&prev.room, Outgoing::reliable(ServerEvent::UserList(roster)))
                .await;
        }

        self.replay_history(room).await;

        let joined = system_message(format!("You have joined the {room} chat room"));
        let _ = self.relay.unicast(self.meta.conn, Outgoing::reliable(joined)).await;

        let notice = system_message(format!("{} has joined the room", self.meta.username));
        let _ = self
            .relay
            .room_except(room, self.meta.conn, Outgoing::reliable(notice))
            .await;

        let roster = self.relay.presence.roster(room).await;
        let _ = self
            .relay
            .room_all(room, Outgoing::reliable(ServerEvent::UserList(roster)))
            .await;

        let rooms = self.relay.presence.active_rooms().await;
        let _ = self
            .relay
            .broadcast_all(Outgoing::reliable(ServerEvent::RoomList { rooms }))
            .await;

        self.metrics.room_joins.inc(&[]);
        tracing::info!(conn = self.meta.conn, user = %self.meta.username, room, "joined room");
    }

    /// Relay a chat message to the current room. `client_id` is the sender's
    /// correlation id, echoed back in the delivery ack; the broadcast and the
    /// persisted entry carry a server-assigned id.
    pub async fn message(&self, client_id: &str, text: &str) {
        let Some(membership) = self.relay.presence.lookup(self.meta.conn).await else {
            // Client raced a disconnect or never joined: drop, not an error.
            tracing::debug!(conn = self.meta.conn, "message while not in a room dropped");
            return;
        };

        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            name: membership.name.clone(),
            text: text.to_string(),
            time: now_rfc3339(),
            status: Some(DeliveryStatus::Delivered),
        };

        let entry = StoredMessage {
            id: message.id.clone(),
            name: message.name.clone(),
            text: message.text.clone(),
            room: membership.room.clone(),
            time: message.time.clone(),
        };
        if let Err(e) = self.history.append(entry).await {
            // Best-effort durability: live delivery proceeds regardless.
            self.metrics.history_append_failures.inc(&[]);
            tracing::warn!(conn = self.meta.conn, error = %e, "history append failed");
        }

        let ack = ServerEvent::MessageDelivered {
            id: client_id.to_string(),
        };
        let _ = self.relay.unicast(self.meta.conn, Outgoing::reliable(ack)).await;

        // The sender already has the message locally; exclude it.
        let _ = self
            .relay
            .room_except(
                &membership.room,
                self.meta.conn,
                Outgoing::reliable(ServerEvent::Message(message)),
            )
            .await;

        self.metrics.messages_relayed.inc(&[]);
    }

    /// Typing indicator: fire-and-forget, droppable under backpressure.
    pub async fn typing(&self, is_typing: bool) {
        let Some(membership) = self.relay.presence.lookup(self.meta.conn).await else {
            return;
        };
        let event = ServerEvent::Typing {
            name: membership.name,
            is_typing,
        };
        let _ = self
            .relay
            .room_except(&membership.room, self.meta.conn, Outgoing::lossy(event))
            .await;
    }

    /// Tear down this connection's presence. Runs exactly once, after the
    /// transport loop has exited. A connection that never joined a room is a
    /// pure cleanup no-op with no broadcasts.
    pub async fn disconnect(&self) {
        let Some(removed) = self.relay.presence.deactivate(self.meta.conn).await else {
            return;
        };

        let notice = system_message(format!("{} has left the room", removed.name));
        let _ = self.relay.room_all(&removed.room, Outgoing::reliable(notice)).await;

        let roster = self.relay.presence.roster(&removed.room).await;
        let _ = self
            .relay
            .room_all(&removed.room, Outgoing::reliable(ServerEvent::UserList(roster)))
            .await;

        let rooms = self.relay.presence.active_rooms().await;
        let _ = self
            .relay
            .broadcast_all(Outgoing::reliable(ServerEvent::RoomList { rooms }))
            .await;

        tracing::info!(conn = self.meta.conn, user = %removed.name, room = %removed.room, "left room on disconnect");
    }

    async fn replay_history(&self, room: &str) {
        let entries = match self.history.recent(room, self.replay_limit).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(conn = self.meta.conn, room, error = %e, "history replay failed");
                return;
            }
        };
        for entry in entries {
            let replayed = ServerEvent::Message(ChatMessage {
                id: entry.id,
                name: entry.name,
                text: entry.text,
                time: entry.time,
                status: None,
            });
            let _ = self
                .relay
                .unicast(self.meta.conn, Outgoing::reliable(replayed))
                .await;
        }
    }
}
