//! Channel-scoped fan-out of events to live connections.
//!
//! [`ChannelRouter`] reads the current members of an event's target channel
//! from the [`ConnectionRegistry`] and queues one shared [`ServerFrame`] on
//! each member's outbox with `try_send`. It never waits on a recipient: a
//! full or closed outbox is a per-recipient delivery failure that is logged
//! and skipped.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;

use crate::domain::{
    ChannelName, ClientEvent, ConnectionId, ConnectionRegistry, Event, Recipient, ServerFrame,
};
use crate::error::GatewayError;

/// Routes events to the subscribers of their target channel.
#[derive(Debug, Clone)]
pub struct ChannelRouter {
    registry: Arc<ConnectionRegistry>,
}

impl ChannelRouter {
    /// Creates a router over `registry`.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the registry the router reads membership from.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Delivers `event` to every subscriber of its target channel except
    /// its origin.
    ///
    /// Returns the number of recipients whose outbox accepted the frame.
    /// An empty channel yields `0`.
    pub async fn broadcast(&self, event: Event) -> usize {
        let recipients = self.registry.recipients(&event.target, event.origin).await;
        if recipients.is_empty() {
            tracing::trace!(channel = %event.target, event = %event.name, "no subscribers");
            return 0;
        }

        let frame = Arc::new(ServerFrame::from_event(&event));
        let mut delivered = 0;
        for recipient in &recipients {
            match deliver(recipient, Arc::clone(&frame)) {
                Ok(()) => delivered += 1,
                Err(err) => tracing::warn!(
                    channel = %event.target,
                    event = %event.name,
                    error = %err,
                    "delivery failed"
                ),
            }
        }

        tracing::debug!(
            channel = %event.target,
            event = %event.name,
            delivered,
            attempted = recipients.len(),
            "event broadcast"
        );
        delivered
    }

    /// Turns a client event from `origin` into one broadcast on the
    /// sender's own pairing channel, excluding the sender.
    ///
    /// An unpaired sender produces no broadcast and returns `0`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if `origin` is not registered,
    /// which means the caller skipped the join step.
    pub async fn handle_client_event(
        &self,
        origin: ConnectionId,
        event: ClientEvent,
    ) -> Result<usize, GatewayError> {
        let sender = self
            .registry
            .connection(origin)
            .await
            .ok_or_else(|| GatewayError::Internal(format!("connection {origin} is not registered")))?;

        let Some(pairing_id) = sender.pairing_id else {
            tracing::debug!(connection_id = %origin, ?event, "client event from unpaired connection");
            return Ok(0);
        };

        let target = ChannelName::pairing(event.purpose(), &pairing_id);
        let outbound = event.into_event(target, &sender.user_id).with_origin(origin);
        Ok(self.broadcast(outbound).await)
    }
}

/// Queues `frame` on one recipient without waiting.
fn deliver(recipient: &Recipient, frame: Arc<ServerFrame>) -> Result<(), GatewayError> {
    recipient.outbox.try_send(frame).map_err(|err| {
        let reason = match err {
            TrySendError::Full(_) => "outbox full",
            TrySendError::Closed(_) => "connection closed",
        };
        GatewayError::DeliveryFailure {
            connection_id: recipient.connection_id,
            reason: reason.to_string(),
        }
    })
}
