//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::CredentialVerifier;
use crate::config::GatewayConfig;
use crate::domain::ConnectionRegistry;
use crate::pairing::{PairingResolver, PairingStore};
use crate::service::{ChannelRouter, Notifier, SessionManager};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
///
/// Owns the one [`ConnectionRegistry`] of the process; it lives exactly as
/// long as the server does.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live connections and channel membership.
    pub registry: Arc<ConnectionRegistry>,
    /// Outbound notify API for other subsystems.
    pub notifier: Notifier,
    /// WebSocket session lifecycle.
    pub sessions: SessionManager,
    /// Key required on `/api/v1/*`, if configured.
    pub notify_api_key: Option<Arc<str>>,
}

impl AppState {
    /// Wires the registry, router, notifier and session manager together.
    #[must_use]
    pub fn new(
        config: &GatewayConfig,
        verifier: Arc<dyn CredentialVerifier>,
        store: Arc<dyn PairingStore>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let router = ChannelRouter::new(Arc::clone(&registry));
        let sessions = SessionManager::new(verifier, PairingResolver::new(store), router.clone())
            .with_outbox_capacity(config.outbox_capacity)
            .with_auth_timeout(config.auth_timeout)
            .with_presence_events(config.presence_events_enabled);

        Self {
            registry,
            notifier: Notifier::new(router),
            sessions,
            notify_api_key: config.notify_api_key.as_deref().map(Arc::from),
        }
    }
}
