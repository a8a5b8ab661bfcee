//! Client → server WebSocket frames.
//!
//! Server → client frames are [`ServerFrame`]s. Client frames carry an
//! optional correlation `id` and an `event` name from the closed set in
//! [`ClientEvent`]; anything else is answered with an error frame.

use serde::Deserialize;

use crate::domain::{ClientEvent, ServerFrame};

/// Close code sent when the handshake credential is rejected.
pub const AUTH_FAILURE_CLOSE_CODE: u16 = 4401;

/// Close reason sent when the handshake credential is rejected.
pub const AUTH_FAILURE_CLOSE_REASON: &str = "unauthorized";

/// Raw client frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    /// Client-provided correlation ID, echoed on error frames.
    #[serde(default)]
    pub id: String,
    /// Event name, e.g. `"typing:start"`.
    pub event: String,
}

/// Parses a text frame into a client event.
///
/// # Errors
///
/// Returns the error frame to send back: code `400` for malformed JSON,
/// `404` for an event name outside the accepted set.
pub fn parse_client_frame(text: &str) -> Result<(String, ClientEvent), ServerFrame> {
    let frame = serde_json::from_str::<ClientFrame>(text)
        .map_err(|_| ServerFrame::error(String::new(), 400, "malformed JSON"))?;
    match ClientEvent::from_name(&frame.event) {
        Some(event) => Ok((frame.id, event)),
        None => Err(ServerFrame::error(frame.id, 404, "unknown event")),
    }
}
