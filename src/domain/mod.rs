//! Domain layer: identifiers, channels, events and the connection registry.
//!
//! This module contains the server-side model of the real-time layer:
//! identity types, channel naming, pairing snapshots, transient events and
//! the registry that tracks which connection belongs to which channel.

pub mod channel;
pub mod connection_registry;
pub mod event;
pub mod ids;
pub mod pairing;

pub use channel::{ChannelName, ChannelPurpose};
pub use connection_registry::{
    ConnectionRegistry, ConnectionSnapshot, Departure, Outbox, Recipient, Registration,
};
pub use event::{ClientEvent, Event, FrameType, ServerFrame};
pub use ids::{ConnectionId, PairingId, UserId};
pub use pairing::{Pairing, PairingStatus};
