//! Client and server event payloads.

use serde::{Deserialize, Serialize};

/// Events a client may send over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", deny_unknown_fields)]
pub enum ClientEvent {
    /// Join a room (leaving the current one, if any).
    #[serde(rename = "enterRoom")]
    EnterRoom { room: String },
    /// Send a chat message to the current room. `id` is the client's own
    /// correlation id; the relay assigns its own id to the broadcast form.
    #[serde(rename = "message")]
    Message { id: String, text: String },
    /// Typing indicator, fire-and-forget.
    #[serde(rename = "typing")]
    Typing {
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
}

/// Delivery status stamped on live (non-replayed) messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
}

/// Broadcast form of a chat message. `id`, `time`, and `status` are assigned
/// by the relay at send time, never client-trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub name: String,
    pub text: String,
    /// RFC 3339 UTC timestamp.
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeliveryStatus>,
}

/// One active roster row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
}

/// One recently-departed roster row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineEntry {
    pub name: String,
    pub room: String,
}

/// Room roster: active members plus recently-departed users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub users: Vec<RosterEntry>,
    #[serde(rename = "offlineUsers")]
    pub offline_users: Vec<OfflineEntry>,
}

/// Events the relay may push to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "message")]
    Message(ChatMessage),
    /// Ack for a client-sent message; echoes the client's correlation id.
    #[serde(rename = "messageDelivered")]
    MessageDelivered { id: String },
    #[serde(rename = "userList")]
    UserList(Roster),
    #[serde(rename = "roomList")]
    RoomList { rooms: Vec<String> },
    #[serde(rename = "typing")]
    Typing {
        name: String,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn client_event_rejects_unknown_fields() {
        let raw = r#"{"event":"enterRoom","data":{"room":"lobby","mode":"x"}}"#;
        assert!(serde_json::from_str::<ClientEvent>(raw).is_err());
    }

    #[test]
    fn client_event_rejects_unknown_event() {
        let raw = r#"{"event":"shutdown","data":{}}"#;
        assert!(serde_json::from_str::<ClientEvent>(raw).is_err());
    }

    #[test]
    fn status_is_omitted_when_absent() {
        let msg = ChatMessage {
            id: "m1".into(),
            name: "alice".into(),
            text: "hi".into(),
            time: "2024-01-01T00:00:00Z".into(),
            status: None,
        };
        let json = serde_json::to_value(ServerEvent::Message(msg)).unwrap();
        assert!(json["data"].get("status").is_none());
    }
}
