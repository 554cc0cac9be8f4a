//! Egress fan-out: deliver one event to one, some, or all connections.
//!
//! Four routing primitives, no business logic: unicast, room broadcast
//! excluding a sender, room broadcast to all members, and a global broadcast.
//! Recipient snapshots are computed from the presence store under its lock
//! and delivery happens after release, so a slow socket never blocks another
//! connection's state transition. Because recipient sets derive from the
//! store, membership *is* the broadcast subscription: a connection that has
//! left a room cannot appear in that room's recipient snapshot.

use std::sync::Arc;

use axum::extract::ws::Message;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio::time::{timeout, Duration};

use roomcast_core::error::{RelayError, Result};
use roomcast_core::protocol::ServerEvent;

use crate::obs::RelayMetrics;

use super::presence::{ConnId, PresenceStore};
use super::session_registry::{Connection, SessionRegistry};

/// Default bounded wait for reliable delivery.
const RELIABLE_TIMEOUT_MS: u64 = 1500;

/// Delivery strategy for outgoing events.
#[derive(Debug, Clone, Copy)]
pub enum QoS {
    /// Latency-critical: do not await; if the recipient queue is full, drop.
    Lossy,
    /// Reliability-critical: attempt delivery with a bounded wait.
    Reliable { timeout_ms: u64 },
}

/// Application-level outgoing event.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub qos: QoS,
    pub event: ServerEvent,
}

impl Outgoing {
    pub fn lossy(event: ServerEvent) -> Self {
        Self {
            qos: QoS::Lossy,
            event,
        }
    }

    pub fn reliable(event: ServerEvent) -> Self {
        Self {
            qos: QoS::Reliable {
                timeout_ms: RELIABLE_TIMEOUT_MS,
            },
            event,
        }
    }
}

/// Event serialized once, cloned per recipient.
#[derive(Debug, Clone)]
struct Prepared(String);

impl Prepared {
    fn prepare(out: &Outgoing) -> Result<Self> {
        let s = serde_json::to_string(&out.event)
            .map_err(|e| RelayError::Internal(format!("event encode failed: {e}")))?;
        Ok(Prepared(s))
    }

    fn to_ws_message(&self) -> Message {
        Message::Text(self.0.clone())
    }
}

/// Relay core: the session registry and presence store plus the delivery
/// primitives over them. One instance per process, owned by the app state.
pub struct RelayCore {
    pub sessions: Arc<SessionRegistry>,
    pub presence: Arc<PresenceStore>,
    metrics: Arc<RelayMetrics>,
}

impl RelayCore {
    pub fn new(metrics: Arc<RelayMetrics>) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new()),
            presence: Arc::new(PresenceStore::new()),
            metrics,
        }
    }

    /// Deliver to a single connection. Unknown ids are a no-op: the
    /// connection may have torn down between snapshot and delivery.
    pub async fn unicast(&self, conn: ConnId, out: Outgoing) -> Result<()> {
        let prepared = Prepared::prepare(&out)?;
        if let Some(target) = self.sessions.get(conn) {
            self.deliver(vec![target], prepared, out.qos).await;
        }
        Ok(())
    }

    /// Deliver to every member of `room` except `sender`.
    pub async fn room_except(&self, room: &str, sender: ConnId, out: Outgoing) -> Result<()> {
        let prepared = Prepared::prepare(&out)?;
        let targets = self.room_targets(room, Some(sender)).await;
        self.deliver(targets, prepared, out.qos).await;
        Ok(())
    }

    /// Deliver to every member of `room`.
    pub async fn room_all(&self, room: &str, out: Outgoing) -> Result<()> {
        let prepared = Prepared::prepare(&out)?;
        let targets = self.room_targets(room, None).await;
        self.deliver(targets, prepared, out.qos).await;
        Ok(())
    }

    /// Deliver to every registered connection (room directory updates).
    pub async fn broadcast_all(&self, out: Outgoing) -> Result<()> {
        let prepared = Prepared::prepare(&out)?;
        let targets = self.sessions.all();
        self.deliver(targets, prepared, out.qos).await;
        Ok(())
    }

    async fn room_targets(&self, room: &str, exclude: Option<ConnId>) -> Vec<Connection> {
        self.presence
            .member_conns(room)
            .await
            .into_iter()
            .filter(|id| Some(*id) != exclude)
            .filter_map(|id| self.sessions.get(id))
            .collect()
    }

    async fn deliver(&self, targets: Vec<Connection>, prepared: Prepared, qos: QoS) {
        match qos {
            QoS::Lossy => {
                for target in targets {
                    if target.tx.try_send(prepared.to_ws_message()).is_err() {
                        self.metrics.lossy_dropped.inc(&[]);
                    }
                }
            }
            QoS::Reliable { timeout_ms } => {
                let mut futs = FuturesUnordered::new();
                for target in targets {
                    let msg = prepared.to_ws_message();
                    let retry = prepared.to_ws_message();
                    futs.push(async move {
                        if target.tx.try_send(msg).is_ok() {
                            return true;
                        }
                        // Queue full: fall back to a bounded await so one slow
                        // socket cannot stall the whole fan-out.
                        timeout(Duration::from_millis(timeout_ms), target.tx.send(retry))
                            .await
                            .map(|sent| sent.is_ok())
                            .unwrap_or(false)
                    });
                }
                while let Some(delivered) = futs.next().await {
                    if !delivered {
                        self.metrics.reliable_failures.inc(&[]);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomcast_core::protocol::ServerEvent;
    use tokio::sync::mpsc;

    fn core() -> RelayCore {
        RelayCore::new(Arc::new(RelayMetrics::default()))
    }

    fn join(core: &RelayCore, cap: usize) -> (ConnId, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(cap);
        let id = core.sessions.insert(Connection { tx });
        (id, rx)
    }

    fn room_list() -> Outgoing {
        Outgoing::reliable(ServerEvent::RoomList { rooms: vec![] })
    }

    #[tokio::test]
    async fn room_except_skips_the_sender() {
        let core = core();
        let (a, mut rx_a) = join(&core, 8);
        let (b, mut rx_b) = join(&core, 8);
        core.presence.activate(a, "alice", "lobby").await;
        core.presence.activate(b, "bob", "lobby").await;

        core.room_except("lobby", a, room_list()).await.unwrap();

        assert!(rx_b.try_recv().is_ok());
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn non_members_never_receive_room_events() {
        let core = core();
        let (a, _rx_a) = join(&core, 8);
        let (b, mut rx_b) = join(&core, 8);
        core.presence.activate(a, "alice", "lobby").await;
        core.presence.activate(b, "bob", "annex").await;

        core.room_all("lobby", room_list()).await.unwrap();
        assert!(rx_b.try_recv().is_err());

        // A connection with no room at all is only reachable globally.
        let (_c, mut rx_c) = join(&core, 8);
        core.room_all("lobby", room_list()).await.unwrap();
        assert!(rx_c.try_recv().is_err());

        core.broadcast_all(room_list()).await.unwrap();
        assert!(rx_c.try_recv().is_ok());
    }

    #[tokio::test]
    async fn departed_connection_is_not_a_recipient() {
        let core = core();
        let (a, _rx_a) = join(&core, 8);
        let (b, mut rx_b) = join(&core, 8);
        core.presence.activate(a, "alice", "lobby").await;
        core.presence.activate(b, "bob", "lobby").await;

        core.presence.deactivate(b).await;
        core.room_all("lobby", room_list()).await.unwrap();
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn lossy_drops_when_queue_is_full() {
        let core = core();
        let (a, mut rx_a) = join(&core, 1);
        core.presence.activate(a, "alice", "lobby").await;

        core.room_all("lobby", Outgoing::lossy(ServerEvent::RoomList { rooms: vec![] }))
            .await
            .unwrap();
        core.room_all(
            "lobby",
            Outgoing::lossy(ServerEvent::RoomList {
                rooms: vec!["lost".into()],
            }),
        )
        .await
        .unwrap();

        // First fills the queue, second is dropped.
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_a.try_recv().is_err());
    }
}
