//! # pairlink-gateway
//!
//! Real-time presence and event-broadcast gateway for paired users.
//!
//! Each client holds one WebSocket connection authenticated with a signed
//! credential at handshake time. The gateway resolves the user's active
//! pairing once, subscribes the connection to its private `user:<id>`
//! channel and to the pairing's feature channels, and relays typing
//! indicators, presence and application events (mood, workout, grocery) to
//! whoever is currently connected. Delivery is best-effort: nothing is
//! persisted or replayed.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket)        Other services (HTTP / in-process)
//!     │                            │
//!     ├── WS Handler (ws/)         ├── REST Handlers (api/)
//!     │                            │
//!     ├── SessionManager ──────────┼── Notifier (service/)
//!     │     ├── CredentialVerifier (auth/)
//!     │     └── PairingResolver (pairing/)
//!     │                            │
//!     └────────── ChannelRouter (service/)
//!                      │
//!              ConnectionRegistry (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod pairing;
pub mod server;
pub mod service;
pub mod ws;
