//! WebSocket connection driver.
//!
//! Runs the session lifecycle for a single socket: authenticate and join
//! before reading anything, then serve client events on the read half while
//! a writer task drains the connection's outbox into the write half.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use super::messages::{AUTH_FAILURE_CLOSE_CODE, AUTH_FAILURE_CLOSE_REASON, parse_client_frame};
use crate::domain::{ConnectionId, ServerFrame};
use crate::service::{JoinedSession, SessionManager};

/// Runs one WebSocket connection from handshake to close.
///
/// - Verifies `credential` and joins; on failure sends a close frame with
///   [`AUTH_FAILURE_CLOSE_CODE`] and returns without registering anything.
/// - Forwards queued frames from the outbox to the client.
/// - Dispatches client events until the socket closes or the writer fails.
pub async fn run_connection(socket: WebSocket, sessions: SessionManager, credential: Option<String>) {
    let connection_id = ConnectionId::new();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (session, mut outbox_rx) = match sessions.join(connection_id, credential.as_deref()).await {
        Ok(joined) => joined,
        Err(err) => {
            tracing::info!(connection_id = %connection_id, error = %err, "handshake rejected");
            let close = Message::Close(Some(CloseFrame {
                code: AUTH_FAILURE_CLOSE_CODE,
                reason: AUTH_FAILURE_CLOSE_REASON.into(),
            }));
            let _ = ws_tx.send(close).await;
            return;
        }
    };

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbox_rx.recv().await {
            let json = match serde_json::to_string(&*frame) {
                Ok(json) => json,
                Err(err) => {
                    tracing::error!(error = %err, "failed to encode frame");
                    continue;
                }
            };
            if ws_tx.send(Message::text(json)).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => handle_text(&session, text.as_str()).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(connection_id = %connection_id, error = %err, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            // Writer stopped: the client is gone
            _ = &mut writer => break,
        }
    }

    writer.abort();
    session.close().await;
}

/// Handles a text message from the client, replying with an error frame
/// when it is rejected.
async fn handle_text(session: &JoinedSession, text: &str) {
    let reply = match parse_client_frame(text) {
        Ok((id, event)) => match session.handle_event(event).await {
            Ok(_) => None,
            Err(err) => {
                tracing::error!(connection_id = %session.connection_id(), error = %err, "client event failed");
                Some(ServerFrame::error(id, 500, "internal error"))
            }
        },
        Err(frame) => Some(frame),
    };

    if let Some(frame) = reply
        && let Err(err) = session.reply(frame)
    {
        tracing::warn!(error = %err, "could not queue error frame");
    }
}
