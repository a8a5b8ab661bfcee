//! In-process relationship store for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::PairingStore;
use crate::domain::{Pairing, PairingId, PairingStatus, UserId};
use crate::error::GatewayError;

/// [`PairingStore`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryPairingStore {
    pairings: RwLock<HashMap<PairingId, Pairing>>,
}

impl InMemoryPairingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a pairing.
    pub async fn upsert(&self, pairing: Pairing) {
        self.pairings
            .write()
            .await
            .insert(pairing.id.clone(), pairing);
    }

    /// Marks a pairing as ended. Returns `false` if it does not exist.
    pub async fn end(&self, pairing_id: &PairingId) -> bool {
        match self.pairings.write().await.get_mut(pairing_id) {
            Some(pairing) => {
                pairing.status = PairingStatus::Ended;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl PairingStore for InMemoryPairingStore {
    async fn active_pairings_for(&self, user_id: &UserId) -> Result<Vec<Pairing>, GatewayError> {
        Ok(self
            .pairings
            .read()
            .await
            .values()
            .filter(|p| p.is_active() && p.includes(user_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ended_pairings_are_not_returned() {
        let store = InMemoryPairingStore::new();
        store.upsert(Pairing::active("P", "U1", "U2")).await;

        let Ok(found) = store.active_pairings_for(&UserId::new("U1")).await else {
            panic!("lookup failed");
        };
        assert_eq!(found.len(), 1);

        assert!(store.end(&PairingId::new("P")).await);
        assert!(!store.end(&PairingId::new("missing")).await);
        let Ok(found) = store.active_pairings_for(&UserId::new("U1")).await else {
            panic!("lookup failed");
        };
        assert!(found.is_empty());
    }
}
