//! Decode-once codec for the transport layer.
//!
//! Text frames => `ClientEvent`; ping/pong/close are surfaced for lifecycle
//! management. Binary frames are a protocol violation (the relay protocol is
//! JSON text only).

use axum::extract::ws::Message;

use roomcast_core::{
    error::{RelayError, Result},
    protocol::ClientEvent,
};

#[derive(Debug)]
pub enum Inbound {
    Event(ClientEvent),
    Ping(Vec<u8>),
    Pong,
    Close,
}

/// Frame length in bytes, cheap (no decode). Checked against
/// `limits.max_frame_bytes` before any parsing happens.
pub fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(s) => s.as_bytes().len(),
        Message::Binary(b) => b.len(),
        Message::Ping(v) => v.len(),
        Message::Pong(v) => v.len(),
        Message::Close(_) => 0,
    }
}

pub fn decode(msg: &Message) -> Result<Inbound> {
    match msg {
        Message::Text(s) => {
            let event: ClientEvent = serde_json::from_str(s)
                .map_err(|e| RelayError::BadRequest(format!("invalid event json: {e}")))?;
            Ok(Inbound::Event(event))
        }
        Message::Binary(_) => Err(RelayError::BadRequest("binary frames not supported".into())),
        Message::Ping(v) => Ok(Inbound::Ping(v.clone())),
        Message::Pong(_) => Ok(Inbound::Pong),
        Message::Close(_) => Ok(Inbound::Close),
    }
}
