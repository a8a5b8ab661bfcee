//! Axum WebSocket upgrade handler.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use serde::Deserialize;

use super::connection::run_connection;
use crate::app_state::AppState;

/// Query parameters accepted on the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    /// Handshake credential. Browsers cannot set headers on WebSocket
    /// requests, so the query string is the primary carrier.
    pub token: Option<String>,
}

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
///
/// The credential is taken from `?token=` or, failing that, from an
/// `Authorization: Bearer` header. Verification happens after the upgrade
/// so the rejection is delivered as a close frame.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let credential = params.token.or_else(|| bearer_token(&headers));
    let sessions = state.sessions.clone();

    ws.on_upgrade(move |socket| run_connection(socket, sessions, credential))
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
///
/// The scheme name is matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim_start().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}
