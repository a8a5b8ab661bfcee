//! Health, stats and channel inspection bodies.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"` when the server answers.
    pub status: String,
    /// Server time, RFC 3339.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
}

/// Live connection statistics.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    /// Registered connections.
    pub connections: usize,
    /// Channels with at least one subscriber.
    pub channels: usize,
}

/// Subscriber count of one channel.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChannelInfoResponse {
    /// Channel name.
    pub channel: String,
    /// Current subscribers.
    pub subscribers: usize,
}
