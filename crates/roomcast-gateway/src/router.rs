//! Axum router wiring.
//!
//! `/v1/ws` for WebSocket upgrades, `/login` + `/chat` for the non-realtime
//! surface, `/healthz` + `/metrics` for ops.

use axum::{
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, http, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/ws", get(transport::ws::ws_upgrade))
        .route("/login", post(http::login))
        .route("/chat", get(http::chat_history))
        .route("/healthz", get(http::healthz))
        .route("/metrics", get(http::metrics))
        .with_state(state)
}
