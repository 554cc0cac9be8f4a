//! Wire-format vector tests for relay events.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;

use roomcast_core::protocol::{ChatMessage, ClientEvent, DeliveryStatus, ServerEvent};

fn load(name: &str) -> String {
    fs::read_to_string(format!("tests/vectors/{name}")).unwrap()
}

#[test]
fn parse_enter_room() {
    let s = load("enter_room.json");
    let ev: ClientEvent = serde_json::from_str(&s).unwrap();
    assert_eq!(
        ev,
        ClientEvent::EnterRoom {
            room: "lobby".into()
        }
    );
}

#[test]
fn parse_client_message() {
    let s = load("client_message.json");
    let ev: ClientEvent = serde_json::from_str(&s).unwrap();
    match ev {
        ClientEvent::Message { id, text } => {
            assert_eq!(id, "c-17");
            assert_eq!(text, "hello there");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn parse_typing() {
    let s = load("typing.json");
    let ev: ClientEvent = serde_json::from_str(&s).unwrap();
    assert_eq!(ev, ClientEvent::Typing { is_typing: true });
}

#[test]
fn server_message_round_trips() {
    let s = load("server_message.json");
    let expected: serde_json::Value = serde_json::from_str(&s).unwrap();

    let ev = ServerEvent::Message(ChatMessage {
        id: "8f14e45f-ea2a-4e5a-9d4b-1b1a2c3d4e5f".into(),
        name: "alice".into(),
        text: "hello there".into(),
        time: "2024-06-01T12:00:00Z".into(),
        status: Some(DeliveryStatus::Delivered),
    });
    assert_eq!(serde_json::to_value(&ev).unwrap(), expected);

    let parsed: ServerEvent = serde_json::from_str(&s).unwrap();
    assert_eq!(parsed, ev);
}

#[test]
fn user_list_shape() {
    let s = load("user_list.json");
    let ev: ServerEvent = serde_json::from_str(&s).unwrap();
    match ev {
        ServerEvent::UserList(roster) => {
            assert_eq!(roster.users.len(), 2);
            assert_eq!(roster.users[0].name, "alice");
            assert_eq!(roster.offline_users.len(), 1);
            assert_eq!(roster.offline_users[0].room, "lobby");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn room_list_shape() {
    let s = load("room_list.json");
    let ev: ServerEvent = serde_json::from_str(&s).unwrap();
    assert_eq!(
        ev,
        ServerEvent::RoomList {
            rooms: vec!["general".into(), "lobby".into()]
        }
    );
}
