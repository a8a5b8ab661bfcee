//! Read-only view of an external relationship record.

use serde::{Deserialize, Serialize};

use super::{PairingId, UserId};

/// Lifecycle flag of a pairing as reported by the relationship store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingStatus {
    /// Both members are currently paired.
    Active,
    /// The relationship has ended.
    Ended,
}

/// A relationship linking exactly two users.
///
/// The gateway never owns pairings: it reads one snapshot per connection at
/// join time and does not revalidate it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    /// Pairing identifier.
    pub id: PairingId,
    /// First member.
    pub member_a: UserId,
    /// Second member.
    pub member_b: UserId,
    /// Current status.
    pub status: PairingStatus,
}

impl Pairing {
    /// Creates an active pairing between two users.
    #[must_use]
    pub fn active(id: impl Into<PairingId>, a: impl Into<UserId>, b: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            member_a: a.into(),
            member_b: b.into(),
            status: PairingStatus::Active,
        }
    }

    /// Returns `true` if `user_id` is either member.
    #[must_use]
    pub fn includes(&self, user_id: &UserId) -> bool {
        self.member_a == *user_id || self.member_b == *user_id
    }

    /// Returns `true` if the pairing is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == PairingStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership() {
        let p = Pairing::active("P", "U1", "U2");
        assert!(p.includes(&UserId::new("U1")));
        assert!(!p.includes(&UserId::new("U3")));
        assert!(p.includes(&UserId::new("U2")));
    }

    #[test]
    fn ended_is_not_active() {
        let mut p = Pairing::active("P", "U1", "U2");
        p.status = PairingStatus::Ended;
        assert!(!p.is_active());
    }
}
