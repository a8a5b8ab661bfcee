//! Channel names and purposes.
//!
//! A channel is either scoped to a pairing (`<purpose>:<pairingId>`) or
//! private to a user (`user:<userId>`). Channels carry no state of their
//! own; the [`super::ConnectionRegistry`] tracks their subscribers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;

use super::{PairingId, UserId};
use crate::error::GatewayError;

const USER_PREFIX: &str = "user";

/// Feature area of a pairing-scoped channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChannelPurpose {
    /// General relationship updates and presence.
    Relationship,
    /// Chat traffic, including typing indicators.
    Chat,
    /// Mood check-ins.
    Mood,
    /// Shared workout activity.
    Workout,
    /// Shared grocery list.
    Grocery,
}

impl ChannelPurpose {
    /// Every purpose a paired connection is subscribed to.
    pub const ALL: [Self; 5] = [
        Self::Relationship,
        Self::Chat,
        Self::Mood,
        Self::Workout,
        Self::Grocery,
    ];

    /// Returns the channel-name prefix for this purpose.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relationship => "relationship",
            Self::Chat => "chat",
            Self::Mood => "mood",
            Self::Workout => "workout",
            Self::Grocery => "grocery",
        }
    }
}

impl fmt::Display for ChannelPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelPurpose {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| GatewayError::InvalidRequest(format!("unknown channel purpose: {s}")))
    }
}

/// Name of a broadcast group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelName {
    /// Private channel of a single user: `user:<userId>`.
    User(UserId),
    /// Channel shared by both members of a pairing: `<purpose>:<pairingId>`.
    Pairing {
        /// Feature area.
        purpose: ChannelPurpose,
        /// Pairing the channel is scoped to.
        pairing_id: PairingId,
    },
}

impl ChannelName {
    /// Private channel for `user_id`.
    #[must_use]
    pub fn user(user_id: &UserId) -> Self {
        Self::User(user_id.clone())
    }

    /// Pairing-scoped channel for `purpose`.
    #[must_use]
    pub fn pairing(purpose: ChannelPurpose, pairing_id: &PairingId) -> Self {
        Self::Pairing {
            purpose,
            pairing_id: pairing_id.clone(),
        }
    }

    /// Returns `true` for pairing-scoped channels.
    #[must_use]
    pub const fn is_pairing_scoped(&self) -> bool {
        matches!(self, Self::Pairing { .. })
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(user_id) => write!(f, "{USER_PREFIX}:{user_id}"),
            Self::Pairing {
                purpose,
                pairing_id,
            } => write!(f, "{purpose}:{pairing_id}"),
        }
    }
}

impl FromStr for ChannelName {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GatewayError::InvalidChannel(s.to_string());
        let (prefix, id) = s.split_once(':').ok_or_else(invalid)?;
        if id.is_empty() {
            return Err(invalid());
        }
        if prefix == USER_PREFIX {
            return Ok(Self::User(UserId::new(id)));
        }
        let purpose = prefix.parse::<ChannelPurpose>().map_err(|_| invalid())?;
        Ok(Self::Pairing {
            purpose,
            pairing_id: PairingId::new(id),
        })
    }
}

impl Serialize for ChannelName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChannelName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
