//! WebSocket transport: upgrade, handshake auth, and the per-session loop.
//!
//! Responsibilities:
//! - Verify the handshake token *before* the upgrade; rejected connections
//!   never reach the relay (HTTP 401, no state created).
//! - Register the connection, greet it, and run its session loop.
//! - Lifecycle: heartbeat ping + idle timeout.
//! - Decode-once, cheap frame-size check first, then hand events to the
//!   session handler. Protocol violations are dropped, never fatal.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use roomcast_core::protocol::ClientEvent;

use crate::app_state::AppState;
use crate::realtime::{Connection, Session, SessionMeta};
use crate::transport::codec::{self, Inbound};

/// Outbound queue depth per connection. When it fills, lossy events drop and
/// reliable events fall back to a bounded await.
const OUTBOUND_QUEUE: usize = 256;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
}

pub async fn ws_upgrade(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    Query(q): Query<WsQuery>,
) -> Response {
    let username = match app.auth().verify(&q.token) {
        Ok(username) => username,
        Err(_) => {
            app.metrics().auth_rejections.inc(&[("stage", "ws")]);
            tracing::warn!("websocket handshake rejected: invalid token");
            return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
        }
    };
    ws.on_upgrade(move |socket| run_session(app, username, socket))
}

async fn run_session(app: AppState, username: String, socket: WebSocket) {
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE);

    let relay = app.relay();
    let conn = relay.sessions.insert(Connection { tx: out_tx.clone() });
    app.metrics().ws_sessions_active.inc(&[]);

    let session = Session::new(
        SessionMeta {
            conn,
            username: username.clone(),
        },
        relay.clone(),
        app.history(),
        app.metrics(),
        app.cfg().history.replay_limit,
    );

    tracing::info!(conn, user = %username, "session connected");
    session.welcome().await;

    let (mut ws_tx, mut ws_rx) = socket.split();

    let gw = &app.cfg().gateway;
    let idle_timeout = Duration::from_millis(gw.idle_timeout_ms);
    let mut ping_tick = tokio::time::interval(Duration::from_millis(gw.ping_interval_ms));
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let max_frame = app.cfg().limits.max_frame_bytes;
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                match maybe_out {
                    Some(m) => {
                        if ws_tx.send(m).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(incoming) = incoming else { break; };
                let Ok(msg) = incoming else { break; };

                last_activity = Instant::now();

                if codec::frame_len(&msg) > max_frame {
                    tracing::debug!(conn, "oversized frame dropped");
                    continue;
                }

                match codec::decode(&msg) {
                    Ok(Inbound::Event(event)) => match event {
                        ClientEvent::EnterRoom { room } => session.enter_room(&room).await,
                        ClientEvent::Message { id, text } => session.message(&id, &text).await,
                        ClientEvent::Typing { is_typing } => session.typing(is_typing).await,
                    },
                    Ok(Inbound::Ping(payload)) => {
                        let _ = out_tx.send(Message::Pong(payload)).await;
                    }
                    Ok(Inbound::Pong) => {}
                    Ok(Inbound::Close) => break,
                    Err(e) => {
                        // Protocol violation: drop the frame, keep the session.
                        tracing::debug!(conn, error = %e, "frame dropped");
                    }
                }
            }

            // heartbeat
            _ = ping_tick.tick() => {
                let _ = out_tx.send(Message::Ping(Vec::new())).await;
            }

            // idle timeout
            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if last_activity.elapsed() >= idle_timeout {
                    tracing::info!(conn, user = %username, "idle timeout");
                    break;
                }
            }
        }
    }

    // Teardown, exactly once per connection. Deregister first so the global
    // room-list broadcast below skips the dying connection.
    relay.sessions.remove(conn);
    session.disconnect().await;
    app.metrics().ws_sessions_active.dec(&[]);
    tracing::info!(conn, user = %username, "session closed");
}
