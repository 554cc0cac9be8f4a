//! Thin HTTP surface: login, bounded history fetch, and ops endpoints.
//!
//! Everything here is request/response plumbing around the collaborators;
//! none of it touches presence state.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginReq {
    pub username: String,
}

/// `POST /login` — exchange a username for a signed token.
pub async fn login(State(app): State<AppState>, Json(req): Json<LoginReq>) -> Response {
    let username = req.username.trim();
    if username.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "username required" })),
        )
            .into_response();
    }

    match app.auth().issue(username) {
        Ok(token) => Json(json!({ "ok": true, "token": token, "username": username })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "token issue failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "token issue failed" })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub room: String,
}

/// `GET /chat?room=...` — authenticated bounded history fetch, oldest first.
pub async fn chat_history(
    State(app): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<HistoryQuery>,
) -> Response {
    let verified = bearer_token(&headers).and_then(|t| app.auth().verify(t).ok());
    let Some(username) = verified else {
        app.metrics().auth_rejections.inc(&[("stage", "http")]);
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid token" })),
        )
            .into_response();
    };

    let room = q.room.trim();
    if room.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "room query required" })),
        )
            .into_response();
    }

    match app.history().recent(room, app.cfg().history.replay_limit).await {
        Ok(entries) => {
            tracing::debug!(user = %username, room, count = entries.len(), "history fetch");
            Json(entries).into_response()
        }
        Err(e) => {
            tracing::error!(room, error = %e, "history fetch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "history unavailable" })),
            )
                .into_response()
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = auth.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then_some(token.trim())
}

/// `GET /healthz` — liveness.
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// `GET /metrics` — Prometheus text format.
pub async fn metrics(State(app): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        app.metrics().render(),
    )
        .into_response()
}
