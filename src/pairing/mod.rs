//! Pairing resolution against the external relationship store.
//!
//! [`PairingStore`] abstracts the relationship-data subsystem.
//! [`PairingResolver`] applies the join-time rules on top of it: only active
//! pairings that include the user count, and if the store ever returns more
//! than one, the lexicographically smallest identifier wins.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryPairingStore;
pub use postgres::PostgresPairingStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Pairing, UserId};
use crate::error::GatewayError;

/// Read access to the relationship store.
#[async_trait]
pub trait PairingStore: Send + Sync + std::fmt::Debug {
    /// Returns every active pairing in which `user_id` is a member.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PairingStore`] when the store is unreachable.
    async fn active_pairings_for(&self, user_id: &UserId) -> Result<Vec<Pairing>, GatewayError>;
}

/// Resolves the single active pairing of a user.
#[derive(Debug, Clone)]
pub struct PairingResolver {
    store: Arc<dyn PairingStore>,
}

impl PairingResolver {
    /// Creates a resolver over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn PairingStore>) -> Self {
        Self { store }
    }

    /// Finds the active pairing `user_id` belongs to.
    ///
    /// `Ok(None)` is the unpaired state, not an error.
    ///
    /// # Errors
    ///
    /// Propagates [`GatewayError::PairingStore`] from the store.
    pub async fn resolve_active_pairing(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Pairing>, GatewayError> {
        let candidates: Vec<Pairing> = self
            .store
            .active_pairings_for(user_id)
            .await?
            .into_iter()
            .filter(|p| p.is_active() && p.includes(user_id))
            .collect();

        if candidates.len() > 1 {
            tracing::warn!(
                user_id = %user_id,
                count = candidates.len(),
                "multiple active pairings; using smallest id"
            );
        }

        Ok(candidates.into_iter().min_by(|a, b| a.id.cmp(&b.id)))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{PairingId, PairingStatus};

    #[derive(Debug)]
    struct FailingStore;

    #[async_trait]
    impl PairingStore for FailingStore {
        async fn active_pairings_for(&self, _: &UserId) -> Result<Vec<Pairing>, GatewayError> {
            Err(GatewayError::PairingStore("connection refused".into()))
        }
    }

    #[derive(Debug)]
    struct FixedStore(Vec<Pairing>);

    #[async_trait]
    impl PairingStore for FixedStore {
        async fn active_pairings_for(&self, _: &UserId) -> Result<Vec<Pairing>, GatewayError> {
            Ok(self.0.clone())
        }
    }

    fn resolver(pairings: Vec<Pairing>) -> PairingResolver {
        PairingResolver::new(Arc::new(FixedStore(pairings)))
    }

    #[tokio::test]
    async fn no_pairing_is_not_an_error() {
        let result = resolver(Vec::new())
            .resolve_active_pairing(&UserId::new("U1"))
            .await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn single_active_pairing_is_returned() {
        let result = resolver(vec![Pairing::active("P", "U1", "U2")])
            .resolve_active_pairing(&UserId::new("U2"))
            .await;
        let Ok(Some(pairing)) = result else {
            panic!("expected a pairing");
        };
        assert_eq!(pairing.id, PairingId::new("P"));
    }

    #[tokio::test]
    async fn duplicates_resolve_to_smallest_id() {
        let result = resolver(vec![
            Pairing::active("p-c", "U1", "U2"),
            Pairing::active("p-a", "U3", "U1"),
            Pairing::active("p-b", "U1", "U4"),
        ])
        .resolve_active_pairing(&UserId::new("U1"))
        .await;
        let Ok(Some(pairing)) = result else {
            panic!("expected a pairing");
        };
        assert_eq!(pairing.id, PairingId::new("p-a"));
    }

    #[tokio::test]
    async fn ended_and_foreign_records_are_ignored() {
        let mut ended = Pairing::active("p-a", "U1", "U2");
        ended.status = PairingStatus::Ended;
        let foreign = Pairing::active("p-b", "U8", "U9");
        let result = resolver(vec![ended, foreign])
            .resolve_active_pairing(&UserId::new("U1"))
            .await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let resolver = PairingResolver::new(Arc::new(FailingStore));
        let result = resolver.resolve_active_pairing(&UserId::new("U1")).await;
        assert!(matches!(result, Err(GatewayError::PairingStore(_))));
    }
}
