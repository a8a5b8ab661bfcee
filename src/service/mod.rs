//! Service layer: routing, session lifecycle and the outbound notify API.
//!
//! [`ChannelRouter`] fans events out over the connection registry,
//! [`SessionManager`] drives each connection from handshake to close, and
//! [`Notifier`] is what the rest of the application calls to push events.

pub mod channel_router;
pub mod notifier;
pub mod session;

pub use channel_router::ChannelRouter;
pub use notifier::Notifier;
pub use session::{JoinedSession, OutboxReceiver, SessionManager, SessionState};
