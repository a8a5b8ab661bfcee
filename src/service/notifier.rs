//! Outbound entry point for other subsystems.
//!
//! CRUD handlers (mood check-ins, workouts, grocery lists) push real-time
//! updates through [`Notifier`] without knowing anything about sockets.
//! Every wrapper only computes a channel name and calls
//! [`Notifier::notify_channel`].

use crate::domain::{ChannelName, ChannelPurpose, Event, PairingId, UserId};

use super::ChannelRouter;

/// Pushes system-originated events to channels.
#[derive(Debug, Clone)]
pub struct Notifier {
    router: ChannelRouter,
}

impl Notifier {
    /// Creates a notifier over `router`.
    #[must_use]
    pub fn new(router: ChannelRouter) -> Self {
        Self { router }
    }

    /// Broadcasts `event` with `payload` to every subscriber of `channel`.
    ///
    /// Returns the number of connections the event was queued for.
    pub async fn notify_channel(
        &self,
        channel: ChannelName,
        event: &str,
        payload: serde_json::Value,
    ) -> usize {
        self.router.broadcast(Event::new(channel, event, payload)).await
    }

    /// Sends to every connection of one user.
    pub async fn notify_user(
        &self,
        user_id: &UserId,
        event: &str,
        payload: serde_json::Value,
    ) -> usize {
        self.notify_channel(ChannelName::user(user_id), event, payload)
            .await
    }

    /// Sends to both members of a pairing on the channel for `purpose`.
    pub async fn notify_pairing(
        &self,
        pairing_id: &PairingId,
        purpose: ChannelPurpose,
        event: &str,
        payload: serde_json::Value,
    ) -> usize {
        self.notify_channel(ChannelName::pairing(purpose, pairing_id), event, payload)
            .await
    }

    /// General relationship update.
    pub async fn notify_relationship(
        &self,
        pairing_id: &PairingId,
        event: &str,
        payload: serde_json::Value,
    ) -> usize {
        self.notify_pairing(pairing_id, ChannelPurpose::Relationship, event, payload)
            .await
    }

    /// Chat update.
    pub async fn notify_chat(
        &self,
        pairing_id: &PairingId,
        event: &str,
        payload: serde_json::Value,
    ) -> usize {
        self.notify_pairing(pairing_id, ChannelPurpose::Chat, event, payload)
            .await
    }

    /// Mood check-in update.
    pub async fn notify_mood(
        &self,
        pairing_id: &PairingId,
        event: &str,
        payload: serde_json::Value,
    ) -> usize {
        self.notify_pairing(pairing_id, ChannelPurpose::Mood, event, payload)
            .await
    }

    /// Workout activity update.
    pub async fn notify_workout(
        &self,
        pairing_id: &PairingId,
        event: &str,
        payload: serde_json::Value,
    ) -> usize {
        self.notify_pairing(pairing_id, ChannelPurpose::Workout, event, payload)
            .await
    }

    /// Grocery list update.
    pub async fn notify_grocery(
        &self,
        pairing_id: &PairingId,
        event: &str,
        payload: serde_json::Value,
    ) -> usize {
        self.notify_pairing(pairing_id, ChannelPurpose::Grocery, event, payload)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;
    use crate::domain::{ConnectionId, ConnectionRegistry};

    #[tokio::test]
    async fn wrappers_target_their_purpose_channel() {
        let registry = Arc::new(ConnectionRegistry::new());
        let notifier = Notifier::new(ChannelRouter::new(Arc::clone(&registry)));
        let pairing = PairingId::new("P");
        let (tx, mut rx) = mpsc::channel(16);
        let result = registry
            .register(ConnectionId::new(), UserId::new("U1"), Some(pairing.clone()), tx)
            .await;
        assert!(result.is_ok());

        let payload = serde_json::json!({ "mood": "happy" });
        assert_eq!(notifier.notify_mood(&pairing, "mood:updated", payload.clone()).await, 1);
        assert_eq!(notifier.notify_workout(&pairing, "workout:logged", payload.clone()).await, 1);
        assert_eq!(notifier.notify_grocery(&pairing, "grocery:changed", payload.clone()).await, 1);
        assert_eq!(notifier.notify_relationship(&pairing, "relationship:updated", payload.clone()).await, 1);
        assert_eq!(notifier.notify_chat(&pairing, "chat:message", payload.clone()).await, 1);
        assert_eq!(notifier.notify_user(&UserId::new("U1"), "account:updated", payload).await, 1);

        let mut channels = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            channels.extend(frame.channel.clone());
        }
        assert_eq!(
            channels,
            ["mood:P", "workout:P", "grocery:P", "relationship:P", "chat:P", "user:U1"]
        );
    }

    #[tokio::test]
    async fn other_users_channel_is_not_reached() {
        let registry = Arc::new(ConnectionRegistry::new());
        let notifier = Notifier::new(ChannelRouter::new(Arc::clone(&registry)));
        let (tx, mut rx) = mpsc::channel(4);
        let result = registry
            .register(ConnectionId::new(), UserId::new("U1"), None, tx)
            .await;
        assert!(result.is_ok());

        assert_eq!(
            notifier
                .notify_user(&UserId::new("U2"), "account:updated", serde_json::Value::Null)
                .await,
            0
        );
        assert!(rx.try_recv().is_err());
    }
}
