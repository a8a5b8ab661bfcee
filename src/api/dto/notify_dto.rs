//! Request and response bodies of the notify endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ChannelPurpose;
use crate::error::GatewayError;

/// Longest accepted event name.
pub const MAX_EVENT_NAME_LEN: usize = 128;

/// Body of `POST /api/v1/events`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NotifyChannelRequest {
    /// Target channel, e.g. `"mood:p-123"` or `"user:u-9"`.
    pub channel: String,
    /// Event name delivered to clients.
    pub event: String,
    /// Opaque payload.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
}

/// Body of `POST /api/v1/pairings/{pairing_id}/events`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NotifyPairingRequest {
    /// Feature area of the pairing channel.
    pub purpose: ChannelPurpose,
    /// Event name delivered to clients.
    pub event: String,
    /// Opaque payload.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
}

/// Body of `POST /api/v1/users/{user_id}/events`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NotifyUserRequest {
    /// Event name delivered to clients.
    pub event: String,
    /// Opaque payload.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
}

/// Result of a notify call.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotifyResponse {
    /// Channel the event was broadcast on.
    pub channel: String,
    /// Number of connections the event was queued for.
    pub delivered: usize,
}

/// Checks that an event name is non-empty and reasonably short.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] otherwise.
pub fn validate_event_name(event: &str) -> Result<&str, GatewayError> {
    let event = event.trim();
    if event.is_empty() {
        return Err(GatewayError::InvalidRequest("event name is empty".to_string()));
    }
    if event.len() > MAX_EVENT_NAME_LEN {
        return Err(GatewayError::InvalidRequest(format!(
            "event name exceeds {MAX_EVENT_NAME_LEN} bytes"
        )));
    }
    Ok(event)
}
