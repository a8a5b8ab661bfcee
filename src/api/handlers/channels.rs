//! Read-only views of the connection registry.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ChannelInfoResponse, StatsResponse};
use crate::app_state::AppState;
use crate::domain::ChannelName;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /channels/{channel}` — Subscriber count of a channel.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidChannel`] if the name does not parse.
#[utoipa::path(
    get,
    path = "/api/v1/channels/{channel}",
    tag = "Channels",
    summary = "Inspect a channel",
    description = "Returns how many connections are currently subscribed. Unknown channels report 0.",
    params(("channel" = String, Path, description = "Channel name, e.g. `chat:p-1`")),
    responses(
        (status = 200, description = "Channel info", body = ChannelInfoResponse),
        (status = 400, description = "Invalid channel name", body = ErrorResponse),
    )
)]
pub async fn get_channel(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let channel: ChannelName = channel.parse()?;
    let subscribers = state.registry.subscriber_count(&channel).await;
    Ok(Json(ChannelInfoResponse {
        channel: channel.to_string(),
        subscribers,
    }))
}

/// `GET /stats` — Live connection statistics.
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    tag = "Channels",
    summary = "Connection statistics",
    description = "Number of registered connections and non-empty channels.",
    responses(
        (status = 200, description = "Statistics", body = StatsResponse),
    )
)]
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatsResponse {
        connections: state.registry.connection_count().await,
        channels: state.registry.channel_count().await,
    })
}

/// Channel inspection routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/channels/{channel}", get(get_channel))
        .route("/stats", get(stats))
}
