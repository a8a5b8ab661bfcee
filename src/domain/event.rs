//! Transient events and the frames they are delivered as.
//!
//! An [`Event`] is addressed to one [`ChannelName`]. The router turns it
//! into a single [`ServerFrame`] shared by every recipient's outbox.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChannelName, ChannelPurpose, ConnectionId, UserId};

/// Outbound event emitted when a partner starts or stops typing.
pub const PARTNER_TYPING: &str = "partner:typing";
/// Outbound event emitted when a partner connects.
pub const PARTNER_ONLINE: &str = "partner:online";
/// Outbound event emitted when a partner disconnects.
pub const PARTNER_OFFLINE: &str = "partner:offline";

/// An event addressed to every subscriber of a channel.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event name delivered to clients (e.g. `"mood:updated"`).
    pub name: String,
    /// Opaque payload.
    pub payload: serde_json::Value,
    /// Connection that caused the event; excluded from the fan-out.
    pub origin: Option<ConnectionId>,
    /// Channel the event is addressed to.
    pub target: ChannelName,
}

impl Event {
    /// Creates a system-originated event with no excluded connection.
    #[must_use]
    pub fn new(target: ChannelName, name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
            origin: None,
            target,
        }
    }

    /// Marks `origin` as the sender so it does not receive its own echo.
    #[must_use]
    pub fn with_origin(mut self, origin: ConnectionId) -> Self {
        self.origin = Some(origin);
        self
    }

    /// `partner:typing` event for `user_id`.
    #[must_use]
    pub fn typing(target: ChannelName, user_id: &UserId, typing: bool) -> Self {
        Self::new(
            target,
            PARTNER_TYPING,
            serde_json::json!({ "userId": user_id, "typing": typing }),
        )
    }

    /// `partner:online` / `partner:offline` event for `user_id`.
    #[must_use]
    pub fn presence(target: ChannelName, user_id: &UserId, online: bool) -> Self {
        let name = if online { PARTNER_ONLINE } else { PARTNER_OFFLINE };
        Self::new(target, name, serde_json::json!({ "userId": user_id }))
    }
}

/// Closed set of events a client may send after joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// `typing:start`
    TypingStart,
    /// `typing:stop`
    TypingStop,
}

impl ClientEvent {
    /// Looks up a client event by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "typing:start" => Some(Self::TypingStart),
            "typing:stop" => Some(Self::TypingStop),
            _ => None,
        }
    }

    /// Pairing channel the resulting broadcast is sent on.
    #[must_use]
    pub const fn purpose(self) -> ChannelPurpose {
        match self {
            Self::TypingStart | Self::TypingStop => ChannelPurpose::Chat,
        }
    }

    /// Builds the outbound event sent on behalf of `sender`.
    #[must_use]
    pub fn into_event(self, target: ChannelName, sender: &UserId) -> Event {
        match self {
            Self::TypingStart => Event::typing(target, sender, true),
            Self::TypingStop => Event::typing(target, sender, false),
        }
    }
}

/// Discriminator for server → client frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    /// Channel broadcast.
    Event,
    /// Rejection of a client frame.
    Error,
}

/// Server → client WebSocket frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerFrame {
    /// Server-generated ID for events; echoes the client ID for errors.
    pub id: String,
    /// Frame type discriminator.
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Event name (absent on errors).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Channel the event was broadcast on (absent on errors).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

impl ServerFrame {
    /// Builds the frame delivered for `event`.
    #[must_use]
    pub fn from_event(event: &Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            frame_type: FrameType::Event,
            timestamp: Utc::now(),
            event: Some(event.name.clone()),
            channel: Some(event.target.to_string()),
            payload: event.payload.clone(),
        }
    }

    /// Builds an error frame answering client request `id`.
    #[must_use]
    pub fn error(id: impl Into<String>, code: u16, message: &str) -> Self {
        Self {
            id: id.into(),
            frame_type: FrameType::Error,
            timestamp: Utc::now(),
            event: None,
            channel: None,
            payload: serde_json::json!({ "code": code, "message": message }),
        }
    }
}
