//! Notify handlers: let other services push events to connected clients.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{
    NotifyChannelRequest, NotifyPairingRequest, NotifyResponse, NotifyUserRequest,
    validate_event_name,
};
use crate::app_state::AppState;
use crate::domain::{ChannelName, PairingId, UserId};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /events` — Broadcast to any channel.
///
/// # Errors
///
/// Returns [`GatewayError`] on an invalid channel or event name.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Notify",
    summary = "Broadcast an event to a channel",
    description = "Queues the event for every connection currently subscribed to `channel`. An empty channel is not an error; `delivered` is 0.",
    request_body = NotifyChannelRequest,
    responses(
        (status = 202, description = "Event queued", body = NotifyResponse),
        (status = 400, description = "Invalid channel or event name", body = ErrorResponse),
        (status = 401, description = "Missing or wrong API key", body = ErrorResponse),
    )
)]
pub async fn notify_channel(
    State(state): State<AppState>,
    Json(req): Json<NotifyChannelRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let channel: ChannelName = req.channel.parse()?;
    let event = validate_event_name(&req.event)?;
    let delivered = state
        .notifier
        .notify_channel(channel.clone(), event, req.payload)
        .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(NotifyResponse {
            channel: channel.to_string(),
            delivered,
        }),
    ))
}

/// `POST /pairings/{pairing_id}/events` — Broadcast to a pairing channel.
///
/// # Errors
///
/// Returns [`GatewayError`] on an invalid event name.
#[utoipa::path(
    post,
    path = "/api/v1/pairings/{pairing_id}/events",
    tag = "Notify",
    summary = "Broadcast an event to a pairing",
    description = "Sends to both members of the pairing on the channel for the given purpose.",
    params(("pairing_id" = String, Path, description = "Pairing identifier")),
    request_body = NotifyPairingRequest,
    responses(
        (status = 202, description = "Event queued", body = NotifyResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or wrong API key", body = ErrorResponse),
    )
)]
pub async fn notify_pairing(
    State(state): State<AppState>,
    Path(pairing_id): Path<String>,
    Json(req): Json<NotifyPairingRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let event = validate_event_name(&req.event)?;
    let pairing_id = PairingId::new(pairing_id);
    let delivered = state
        .notifier
        .notify_pairing(&pairing_id, req.purpose, event, req.payload)
        .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(NotifyResponse {
            channel: ChannelName::pairing(req.purpose, &pairing_id).to_string(),
            delivered,
        }),
    ))
}

/// `POST /users/{user_id}/events` — Send to one user's private channel.
///
/// # Errors
///
/// Returns [`GatewayError`] on an invalid event name.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/events",
    tag = "Notify",
    summary = "Send an event to a user",
    description = "Sends to every live connection of the user.",
    params(("user_id" = String, Path, description = "User identifier")),
    request_body = NotifyUserRequest,
    responses(
        (status = 202, description = "Event queued", body = NotifyResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or wrong API key", body = ErrorResponse),
    )
)]
pub async fn notify_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<NotifyUserRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let event = validate_event_name(&req.event)?;
    let user_id = UserId::new(user_id);
    let delivered = state.notifier.notify_user(&user_id, event, req.payload).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(NotifyResponse {
            channel: ChannelName::user(&user_id).to_string(),
            delivered,
        }),
    ))
}

/// Notify routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(notify_channel))
        .route("/pairings/{pairing_id}/events", post(notify_pairing))
        .route("/users/{user_id}/events", post(notify_user))
}
