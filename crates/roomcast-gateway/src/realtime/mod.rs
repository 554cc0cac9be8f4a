//! Realtime core: presence, connection registry, fan-out, and the
//! per-connection session handler.

pub mod fanout;
pub mod presence;
pub mod session;
pub mod session_registry;

pub use fanout::{Outgoing, QoS, RelayCore};
pub use presence::{ConnId, Membership, PresenceStore};
pub use session::{Session, SessionMeta};
pub use session_registry::{Connection, SessionRegistry};
