//! Relay protocol (JSON events).
//!
//! One lane, text frames only. Every frame is a tagged object
//! `{"event": ..., "data": ...}`; inbound parsing is strict
//! (`deny_unknown_fields`) so malformed traffic is rejected at the edge
//! instead of propagating half-parsed state into the relay.

pub mod events;

pub use events::{
    ChatMessage, ClientEvent, DeliveryStatus, OfflineEntry, Roster, RosterEntry, ServerEvent,
};
