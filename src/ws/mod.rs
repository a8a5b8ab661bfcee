//! WebSocket layer: upgrade, connection driver and client frames.
//!
//! The endpoint at `/ws` authenticates with the handshake credential,
//! joins the connection to its channels and then relays events both ways.

pub mod connection;
pub mod handler;
pub mod messages;
