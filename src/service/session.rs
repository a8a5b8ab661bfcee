//! Per-connection session lifecycle.
//!
//! ```text
//! Connecting ──► Authenticating ──► Joined ──► Closed
//!      │               │                         ▲
//!      └───────────────┴─────────────────────────┘
//! ```
//!
//! [`SessionManager::join`] runs `Connecting → Authenticating → Joined`:
//! verify the handshake credential, resolve the pairing, register the
//! connection. Any failure ends in `Closed` with nothing registered.
//! [`JoinedSession::close`] runs `Joined → Closed` and unregisters the
//! connection. It consumes the session, so it runs at most once; dropping
//! an unclosed session schedules the same cleanup.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::ChannelRouter;
use crate::auth::CredentialVerifier;
use crate::domain::{
    ChannelName, ChannelPurpose, ClientEvent, ConnectionId, Event, Outbox, PairingId, ServerFrame,
    UserId,
};
use crate::error::GatewayError;
use crate::pairing::PairingResolver;

/// Receiving half of a connection's outbound queue.
pub type OutboxReceiver = mpsc::Receiver<Arc<ServerFrame>>;

/// Lifecycle state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport established, nothing checked yet.
    Connecting,
    /// Credential verification and pairing resolution in progress.
    Authenticating,
    /// Registered and serving events.
    Joined,
    /// Terminal.
    Closed,
}

impl SessionState {
    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] for transitions outside the
    /// lifecycle, including any re-authentication of a joined session.
    pub fn transition(self, next: Self) -> Result<Self, GatewayError> {
        use SessionState::{Authenticating, Closed, Connecting, Joined};
        match (self, next) {
            (Connecting, Authenticating)
            | (Authenticating, Joined)
            | (Connecting | Authenticating | Joined, Closed) => Ok(next),
            _ => Err(GatewayError::Internal(format!(
                "invalid session transition {self} -> {next}"
            ))),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Joined => "joined",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Orchestrates connect → authenticate → join → close.
#[derive(Debug, Clone)]
pub struct SessionManager {
    verifier: Arc<dyn CredentialVerifier>,
    resolver: PairingResolver,
    router: ChannelRouter,
    outbox_capacity: usize,
    auth_timeout: Duration,
    presence_events: bool,
}

impl SessionManager {
    /// Creates a session manager.
    #[must_use]
    pub fn new(
        verifier: Arc<dyn CredentialVerifier>,
        resolver: PairingResolver,
        router: ChannelRouter,
    ) -> Self {
        Self {
            verifier,
            resolver,
            router,
            outbox_capacity: 256,
            auth_timeout: Duration::from_secs(10),
            presence_events: true,
        }
    }

    /// Sets the capacity of each connection's outbound queue.
    #[must_use]
    pub fn with_outbox_capacity(mut self, capacity: usize) -> Self {
        self.outbox_capacity = capacity.max(1);
        self
    }

    /// Sets the upper bound on the authenticate-and-join step.
    #[must_use]
    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    /// Enables or disables `partner:online` / `partner:offline` events.
    #[must_use]
    pub fn with_presence_events(mut self, enabled: bool) -> Self {
        self.presence_events = enabled;
        self
    }

    /// Returns the router sessions publish through.
    #[must_use]
    pub fn router(&self) -> &ChannelRouter {
        &self.router
    }

    /// Authenticates `credential` and registers `connection_id`.
    ///
    /// On success returns the joined session and the receiver of its
    /// outbound queue.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Unauthorized`] if the credential is missing or
    ///   invalid, or the step exceeds the auth timeout.
    /// - [`GatewayError::PairingStore`] if the pairing lookup fails.
    /// - [`GatewayError::AlreadyRegistered`] on a connection ID collision.
    ///
    /// In every error case no registry entry exists afterwards.
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        credential: Option<&str>,
    ) -> Result<(JoinedSession, OutboxReceiver), GatewayError> {
        let state = SessionState::Connecting.transition(SessionState::Authenticating)?;
        tracing::debug!(connection_id = %connection_id, %state, "session state");

        let joined = match tokio::time::timeout(
            self.auth_timeout,
            self.authenticate_and_register(connection_id, credential),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(connection_id = %connection_id, "authentication timed out");
                Err(GatewayError::Unauthorized)
            }
        };

        let (session, outbox_rx, first_for_user) = match joined {
            Ok(joined) => joined,
            Err(err) => {
                let state = state.transition(SessionState::Closed)?;
                tracing::debug!(connection_id = %connection_id, %state, error = %err, "session state");
                return Err(err);
            }
        };

        tracing::info!(
            connection_id = %connection_id,
            user_id = %session.user_id,
            pairing_id = ?session.pairing_id.as_ref().map(PairingId::as_str),
            channels = session.channels.len(),
            "session joined"
        );

        if self.presence_events
            && first_for_user
            && let Some(channel) = session.relationship_channel()
        {
            let event = Event::presence(channel, &session.user_id, true).with_origin(connection_id);
            self.router.broadcast(event).await;
        }

        Ok((session, outbox_rx))
    }

    async fn authenticate_and_register(
        &self,
        connection_id: ConnectionId,
        credential: Option<&str>,
    ) -> Result<(JoinedSession, OutboxReceiver, bool), GatewayError> {
        let token = credential
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(GatewayError::Unauthorized)?;
        let user_id = self.verifier.verify(token)?;

        let pairing = self.resolver.resolve_active_pairing(&user_id).await?;
        let pairing_id = pairing.map(|p| p.id);

        let (outbox, outbox_rx) = mpsc::channel(self.outbox_capacity);
        let registration = self
            .router
            .registry()
            .register(connection_id, user_id.clone(), pairing_id.clone(), outbox.clone())
            .await?;

        let session = JoinedSession {
            connection_id,
            user_id,
            pairing_id,
            channels: registration.channels,
            outbox,
            state: SessionState::Authenticating.transition(SessionState::Joined)?,
            manager: self.clone(),
        };
        Ok((session, outbox_rx, registration.first_for_user))
    }
}

/// A registered connection in the `Joined` state.
#[derive(Debug)]
pub struct JoinedSession {
    connection_id: ConnectionId,
    user_id: UserId,
    pairing_id: Option<PairingId>,
    channels: BTreeSet<ChannelName>,
    outbox: Outbox,
    state: SessionState,
    manager: SessionManager,
}

impl JoinedSession {
    /// Connection identifier.
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Authenticated user.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Pairing resolved at join time.
    #[must_use]
    pub fn pairing_id(&self) -> Option<&PairingId> {
        self.pairing_id.as_ref()
    }

    /// Channels the connection was subscribed to.
    #[must_use]
    pub fn channels(&self) -> &BTreeSet<ChannelName> {
        &self.channels
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn relationship_channel(&self) -> Option<ChannelName> {
        self.pairing_id
            .as_ref()
            .map(|p| ChannelName::pairing(ChannelPurpose::Relationship, p))
    }

    /// Handles a client event sent on this connection.
    ///
    /// Returns the number of recipients notified.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the connection is no longer
    /// registered.
    pub async fn handle_event(&self, event: ClientEvent) -> Result<usize, GatewayError> {
        self.manager
            .router
            .handle_client_event(self.connection_id, event)
            .await
    }

    /// Queues a frame for this connection only.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DeliveryFailure`] if the outbox is full or
    /// the writer has stopped.
    pub fn reply(&self, frame: ServerFrame) -> Result<(), GatewayError> {
        self.outbox
            .try_send(Arc::new(frame))
            .map_err(|err| GatewayError::DeliveryFailure {
                connection_id: self.connection_id,
                reason: err.to_string(),
            })
    }

    /// Unregisters the connection and moves to `Closed`.
    pub async fn close(mut self) {
        self.state = SessionState::Closed;
        depart(
            &self.manager.router,
            self.manager.presence_events,
            self.connection_id,
            self.relationship_channel(),
        )
        .await;

        tracing::info!(
            connection_id = %self.connection_id,
            user_id = %self.user_id,
            state = %self.state,
            "session closed"
        );
    }
}

impl Drop for JoinedSession {
    fn drop(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        let router = self.manager.router.clone();
        let presence_events = self.manager.presence_events;
        let connection_id = self.connection_id;
        let relationship = self.relationship_channel();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            tracing::warn!(connection_id = %connection_id, "session dropped without close");
            handle.spawn(async move {
                depart(&router, presence_events, connection_id, relationship).await;
            });
        }
    }
}

/// Unregisters `connection_id` and, if it was the user's last connection,
/// announces `partner:offline` on `relationship`.
async fn depart(
    router: &ChannelRouter,
    presence_events: bool,
    connection_id: ConnectionId,
    relationship: Option<ChannelName>,
) {
    let Some(departure) = router.registry().unregister(connection_id).await else {
        tracing::warn!(connection_id = %connection_id, "session already unregistered");
        return;
    };
    if presence_events
        && departure.last_for_user
        && let Some(channel) = relationship
    {
        router
            .broadcast(Event::presence(channel, &departure.snapshot.user_id, false))
            .await;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::JwtVerifier;
    use crate::domain::event::{PARTNER_OFFLINE, PARTNER_ONLINE, PARTNER_TYPING};
    use crate::domain::{ConnectionRegistry, Pairing};
    use crate::pairing::{InMemoryPairingStore, PairingStore};
    use async_trait::async_trait;

    const SECRET: &[u8] = b"session-secret";

    struct Fixture {
        registry: Arc<ConnectionRegistry>,
        store: Arc<InMemoryPairingStore>,
        verifier: JwtVerifier,
        sessions: SessionManager,
    }

    #[derive(Debug)]
    struct UnreachableStore;

    #[async_trait]
    impl PairingStore for UnreachableStore {
        async fn active_pairings_for(&self, _: &UserId) -> Result<Vec<Pairing>, GatewayError> {
            Err(GatewayError::PairingStore("connection refused".into()))
        }
    }

    #[derive(Debug)]
    struct HangingStore;

    #[async_trait]
    impl PairingStore for HangingStore {
        async fn active_pairings_for(&self, _: &UserId) -> Result<Vec<Pairing>, GatewayError> {
            std::future::pending().await
        }
    }

    fn manager(
        registry: &Arc<ConnectionRegistry>,
        verifier: &JwtVerifier,
        store: Arc<dyn PairingStore>,
    ) -> SessionManager {
        SessionManager::new(
            Arc::new(verifier.clone()),
            PairingResolver::new(store),
            ChannelRouter::new(Arc::clone(registry)),
        )
    }

    async fn fixture(pairings: Vec<Pairing>) -> Fixture {
        let registry = Arc::new(ConnectionRegistry::new());
        let store = Arc::new(InMemoryPairingStore::new());
        for pairing in pairings {
            store.upsert(pairing).await;
        }
        let verifier = JwtVerifier::new(SECRET);
        let sessions = manager(&registry, &verifier, Arc::clone(&store) as Arc<dyn PairingStore>);
        Fixture {
            registry,
            store,
            verifier,
            sessions,
        }
    }

    fn event_names(frames: &[Arc<ServerFrame>]) -> Vec<&str> {
        frames.iter().filter_map(|f| f.event.as_deref()).collect()
    }

    fn token(verifier: &JwtVerifier, user: &str) -> String {
        let Ok(token) = verifier.issue(&UserId::new(user), Duration::from_secs(60)) else {
            panic!("issue failed");
        };
        token
    }

    async fn join(fx: &Fixture, user: &str) -> (JoinedSession, OutboxReceiver) {
        let token = token(&fx.verifier, user);
        let Ok(joined) = fx.sessions.join(ConnectionId::new(), Some(&token)).await else {
            panic!("join failed for {user}");
        };
        joined
    }

    fn drain(rx: &mut OutboxReceiver) -> Vec<Arc<ServerFrame>> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn lifecycle_transitions() {
        use SessionState::*;
        assert!(Connecting.transition(Authenticating).is_ok());
        assert!(Authenticating.transition(Joined).is_ok());
        assert!(Authenticating.transition(Closed).is_ok());
        assert!(Joined.transition(Closed).is_ok());
        assert!(Connecting.transition(Closed).is_ok());

        assert!(Joined.transition(Authenticating).is_err());
        assert!(Connecting.transition(Joined).is_err());
        assert!(Closed.transition(Connecting).is_err());
        assert!(Closed.transition(Closed).is_err());
    }

    #[tokio::test]
    async fn missing_or_bad_credential_registers_nothing() {
        let fx = fixture(Vec::new()).await;
        for credential in [None, Some(""), Some("garbage")] {
            let result = fx.sessions.join(ConnectionId::new(), credential).await;
            assert!(matches!(result, Err(GatewayError::Unauthorized)));
        }
        let foreign = JwtVerifier::new(b"another-secret");
        let forged = token(&foreign, "U1");
        let result = fx.sessions.join(ConnectionId::new(), Some(&forged)).await;
        assert!(matches!(result, Err(GatewayError::Unauthorized)));
        assert_eq!(fx.registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn pairing_store_failure_closes_without_registering() {
        let mut fx = fixture(Vec::new()).await;
        fx.sessions = manager(&fx.registry, &fx.verifier, Arc::new(UnreachableStore));
        let token = token(&fx.verifier, "U1");
        let result = fx.sessions.join(ConnectionId::new(), Some(&token)).await;
        assert!(matches!(result, Err(GatewayError::PairingStore(_))));
        assert_eq!(fx.registry.connection_count().await, 0);
        assert_eq!(fx.registry.channel_count().await, 0);
    }

    #[tokio::test]
    async fn slow_join_times_out_as_unauthorized() {
        let mut fx = fixture(Vec::new()).await;
        fx.sessions = manager(&fx.registry, &fx.verifier, Arc::new(HangingStore))
            .with_auth_timeout(Duration::from_millis(20));
        let token = token(&fx.verifier, "U1");
        let result = fx.sessions.join(ConnectionId::new(), Some(&token)).await;
        assert!(matches!(result, Err(GatewayError::Unauthorized)));
        assert_eq!(fx.registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn ended_pairing_keeps_channels_until_disconnect() {
        let fx = fixture(vec![Pairing::active("P", "U1", "U2")]).await;
        let (u1, mut rx1) = join(&fx, "U1").await;
        assert!(fx.store.end(&PairingId::new("P")).await);

        let chat = ChannelName::pairing(ChannelPurpose::Chat, &PairingId::new("P"));
        let delivered = fx
            .sessions
            .router()
            .broadcast(Event::new(chat.clone(), "chat:message", serde_json::Value::Null))
            .await;
        assert_eq!(delivered, 1);
        assert_eq!(event_names(&drain(&mut rx1)), ["chat:message"]);

        // A fresh join sees the ended pairing and gets no pairing channels.
        let (u2, _rx2) = join(&fx, "U2").await;
        assert_eq!(u2.pairing_id(), None);

        u1.close().await;
        assert_eq!(fx.registry.subscriber_count(&chat).await, 0);
        u2.close().await;
    }

    #[tokio::test]
    async fn second_device_does_not_repeat_presence() {
        let fx = fixture(vec![Pairing::active("P", "U1", "U2")]).await;
        let (u2, mut rx2) = join(&fx, "U2").await;
        let (phone, _rx_phone) = join(&fx, "U1").await;
        let (laptop, _rx_laptop) = join(&fx, "U1").await;
        assert_eq!(event_names(&drain(&mut rx2)), [PARTNER_ONLINE]);

        phone.close().await;
        assert!(drain(&mut rx2).is_empty());
        laptop.close().await;
        assert_eq!(event_names(&drain(&mut rx2)), [PARTNER_OFFLINE]);
        u2.close().await;
    }

    #[tokio::test]
    async fn duplicate_connection_id_is_rejected() {
        let fx = fixture(Vec::new()).await;
        let id = ConnectionId::new();
        let token = token(&fx.verifier, "U1");
        let Ok((first, _rx)) = fx.sessions.join(id, Some(&token)).await else {
            panic!("first join failed");
        };
        let second = fx.sessions.join(id, Some(&token)).await;
        assert!(matches!(second, Err(GatewayError::AlreadyRegistered(dup)) if dup == id));
        assert_eq!(fx.registry.connection_count().await, 1);
        first.close().await;
    }

    #[tokio::test]
    async fn joined_session_channels() {
        let fx = fixture(vec![Pairing::active("P", "U1", "U2")]).await;
        let (session, _rx) = join(&fx, "U1").await;
        assert_eq!(session.state(), SessionState::Joined);
        assert_eq!(session.pairing_id(), Some(&PairingId::new("P")));
        assert!(session.channels().contains(&ChannelName::user(&UserId::new("U1"))));
        assert!(
            session
                .channels()
                .contains(&ChannelName::pairing(ChannelPurpose::Chat, &PairingId::new("P")))
        );
        assert!(
            !session
                .channels()
                .contains(&ChannelName::user(&UserId::new("U2")))
        );
        session.close().await;
    }

    #[tokio::test]
    async fn typing_scenario_end_to_end() {
        let fx = fixture(vec![Pairing::active("P", "U1", "U2")]).await;
        let (u1, mut rx1) = join(&fx, "U1").await;
        let (u2, mut rx2) = join(&fx, "U2").await;

        // U1 sees U2 come online; U2 joined after U1 so sees nothing yet.
        let frames = drain(&mut rx1);
        assert!(frames.iter().any(|f| f.event.as_deref() == Some(PARTNER_ONLINE)));
        assert!(drain(&mut rx2).is_empty());

        let result = u1.handle_event(ClientEvent::TypingStart).await;
        assert!(matches!(result, Ok(1)));
        let frames = drain(&mut rx2);
        let Some(typing) = frames.first() else {
            panic!("U2 received nothing");
        };
        assert_eq!(typing.event.as_deref(), Some(PARTNER_TYPING));
        assert_eq!(typing.payload, serde_json::json!({ "userId": "U1", "typing": true }));
        assert!(drain(&mut rx1).is_empty());

        let u1_id = u1.connection_id();
        u1.close().await;
        assert!(fx.registry.connection(u1_id).await.is_none());
        assert_eq!(
            fx.registry
                .subscriber_count(&ChannelName::user(&UserId::new("U1")))
                .await,
            0
        );
        let frames = drain(&mut rx2);
        assert!(frames.iter().any(|f| f.event.as_deref() == Some(PARTNER_OFFLINE)));

        let delivered = fx
            .sessions
            .router()
            .broadcast(Event::new(
                ChannelName::user(&UserId::new("U1")),
                "ping",
                serde_json::Value::Null,
            ))
            .await;
        assert_eq!(delivered, 0);
        u2.close().await;
        assert_eq!(fx.registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn presence_can_be_disabled() {
        let mut fx = fixture(vec![Pairing::active("P", "U1", "U2")]).await;
        fx.sessions = fx.sessions.clone().with_presence_events(false);
        let (u1, mut rx1) = join(&fx, "U1").await;
        let (u2, _rx2) = join(&fx, "U2").await;
        assert!(drain(&mut rx1).is_empty());
        u2.close().await;
        assert!(drain(&mut rx1).is_empty());
        u1.close().await;
    }

    #[tokio::test]
    async fn dropping_an_unclosed_session_still_unregisters() {
        let fx = fixture(Vec::new()).await;
        let (session, _rx) = join(&fx, "U1").await;
        let id = session.connection_id();
        drop(session);
        for _ in 0..50 {
            if fx.registry.connection(id).await.is_none() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("dropped session was never unregistered");
    }

    #[tokio::test]
    async fn reply_reaches_only_own_outbox() {
        let fx = fixture(vec![Pairing::active("P", "U1", "U2")]).await;
        let (u1, mut rx1) = join(&fx, "U1").await;
        let (u2, mut rx2) = join(&fx, "U2").await;
        drain(&mut rx1);
        assert!(u2.reply(ServerFrame::error("1", 404, "unknown event")).is_ok());
        assert_eq!(drain(&mut rx2).len(), 1);
        assert!(drain(&mut rx1).is_empty());
        u1.close().await;
        u2.close().await;
    }
}
