//! Single source of truth for live connections and channel membership.
//!
//! [`ConnectionRegistry`] keeps two tables, the connection table and the
//! channel index, behind one [`tokio::sync::RwLock`]. Every operation takes
//! the lock exactly once, so register, unregister and membership queries are
//! linearizable: a reader never sees a connection in the channel index that
//! is missing from the connection table, or the reverse.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};

use super::{ChannelName, ChannelPurpose, ConnectionId, PairingId, ServerFrame, UserId};
use crate::error::GatewayError;

/// Sending half of a connection's bounded outbound queue.
pub type Outbox = mpsc::Sender<Arc<ServerFrame>>;

/// Fixed per-connection state, created once at registration.
#[derive(Debug)]
struct ConnectionRecord {
    user_id: UserId,
    pairing_id: Option<PairingId>,
    channels: BTreeSet<ChannelName>,
    connected_at: DateTime<Utc>,
    outbox: Outbox,
}

/// Point-in-time copy of a registered connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    /// Connection identifier.
    pub connection_id: ConnectionId,
    /// Authenticated user.
    pub user_id: UserId,
    /// Pairing resolved at join time, if any.
    pub pairing_id: Option<PairingId>,
    /// Channels the connection is subscribed to.
    pub channels: BTreeSet<ChannelName>,
    /// Registration time.
    pub connected_at: DateTime<Utc>,
}

impl ConnectionSnapshot {
    fn from_record(connection_id: ConnectionId, record: &ConnectionRecord) -> Self {
        Self {
            connection_id,
            user_id: record.user_id.clone(),
            pairing_id: record.pairing_id.clone(),
            channels: record.channels.clone(),
            connected_at: record.connected_at,
        }
    }
}

/// A fan-out target: a channel member together with its outbox.
#[derive(Debug, Clone)]
pub struct Recipient {
    /// Member connection.
    pub connection_id: ConnectionId,
    /// Where frames for this connection are queued.
    pub outbox: Outbox,
}

/// Outcome of a successful [`ConnectionRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Channels the connection now belongs to.
    pub channels: BTreeSet<ChannelName>,
    /// `true` if the user had no other live connection.
    pub first_for_user: bool,
}

/// Outcome of a [`ConnectionRegistry::unregister`] that removed an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    /// The removed connection.
    pub snapshot: ConnectionSnapshot,
    /// `true` if the user has no live connection left.
    pub last_for_user: bool,
}

#[derive(Debug, Default)]
struct Tables {
    connections: HashMap<ConnectionId, ConnectionRecord>,
    channels: HashMap<ChannelName, HashSet<ConnectionId>>,
}

/// Registry of every live connection and the channels it belongs to.
///
/// # Concurrency
///
/// - Membership reads run concurrently with each other.
/// - Register and unregister are serialized against everything else.
/// - No lock is held across an `.await` on external I/O.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    tables: RwLock<Tables>,
}

/// Computes the fixed channel set of a connection.
#[must_use]
pub fn channels_for(user_id: &UserId, pairing_id: Option<&PairingId>) -> BTreeSet<ChannelName> {
    let mut channels = BTreeSet::new();
    channels.insert(ChannelName::user(user_id));
    if let Some(pairing_id) = pairing_id {
        for purpose in ChannelPurpose::ALL {
            channels.insert(ChannelName::pairing(purpose, pairing_id));
        }
    }
    channels
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a connection and subscribes it to its channel set.
    ///
    /// Returns the channels the connection now belongs to, and whether it
    /// is the user's only live connection.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AlreadyRegistered`] if `connection_id` is
    /// already present; the existing entry is left untouched.
    pub async fn register(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        pairing_id: Option<PairingId>,
        outbox: Outbox,
    ) -> Result<Registration, GatewayError> {
        let mut tables = self.tables.write().await;
        if tables.connections.contains_key(&connection_id) {
            return Err(GatewayError::AlreadyRegistered(connection_id));
        }
        let first_for_user = !tables.channels.contains_key(&ChannelName::user(&user_id));

        let channels = channels_for(&user_id, pairing_id.as_ref());
        for channel in &channels {
            tables
                .channels
                .entry(channel.clone())
                .or_default()
                .insert(connection_id);
        }
        tables.connections.insert(
            connection_id,
            ConnectionRecord {
                user_id,
                pairing_id,
                channels: channels.clone(),
                connected_at: Utc::now(),
                outbox,
            },
        );
        Ok(Registration {
            channels,
            first_for_user,
        })
    }

    /// Removes a connection and all of its channel memberships.
    ///
    /// Unknown identifiers are ignored so racing disconnect paths may both
    /// call this. Returns the removed connection, if it was present.
    pub async fn unregister(&self, connection_id: ConnectionId) -> Option<Departure> {
        let mut tables = self.tables.write().await;
        let record = tables.connections.remove(&connection_id)?;
        for channel in &record.channels {
            if let Some(members) = tables.channels.get_mut(channel) {
                members.remove(&connection_id);
                if members.is_empty() {
                    tables.channels.remove(channel);
                }
            }
        }
        let last_for_user = !tables
            .channels
            .contains_key(&ChannelName::user(&record.user_id));
        Some(Departure {
            snapshot: ConnectionSnapshot::from_record(connection_id, &record),
            last_for_user,
        })
    }

    /// Returns the connections currently subscribed to `channel`.
    pub async fn members_of(&self, channel: &ChannelName) -> HashSet<ConnectionId> {
        self.tables
            .read()
            .await
            .channels
            .get(channel)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the fan-out targets of `channel`, minus `exclude`.
    pub async fn recipients(
        &self,
        channel: &ChannelName,
        exclude: Option<ConnectionId>,
    ) -> Vec<Recipient> {
        let tables = self.tables.read().await;
        let Some(members) = tables.channels.get(channel) else {
            return Vec::new();
        };
        members
            .iter()
            .filter(|id| Some(**id) != exclude)
            .filter_map(|id| {
                tables.connections.get(id).map(|record| Recipient {
                    connection_id: *id,
                    outbox: record.outbox.clone(),
                })
            })
            .collect()
    }

    /// Returns a snapshot of one connection.
    pub async fn connection(&self, connection_id: ConnectionId) -> Option<ConnectionSnapshot> {
        let tables = self.tables.read().await;
        tables
            .connections
            .get(&connection_id)
            .map(|record| ConnectionSnapshot::from_record(connection_id, record))
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.tables.read().await.connections.len()
    }

    /// Number of channels with at least one subscriber.
    pub async fn channel_count(&self) -> usize {
        self.tables.read().await.channels.len()
    }

    /// Number of subscribers of `channel`.
    pub async fn subscriber_count(&self, channel: &ChannelName) -> usize {
        self.tables
            .read()
            .await
            .channels
            .get(channel)
            .map_or(0, HashSet::len)
    }

    #[cfg(test)]
    async fn is_consistent(&self) -> bool {
        let tables = self.tables.read().await;
        let index_ok = tables.channels.iter().all(|(channel, members)| {
            !members.is_empty()
                && members.iter().all(|id| {
                    tables
                        .connections
                        .get(id)
                        .is_some_and(|r| r.channels.contains(channel))
                })
        });
        let records_ok = tables.connections.iter().all(|(id, record)| {
            record.channels.iter().all(|channel| {
                tables
                    .channels
                    .get(channel)
                    .is_some_and(|members| members.contains(id))
            })
        });
        index_ok && records_ok
    }
}
