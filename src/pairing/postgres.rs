//! PostgreSQL implementation of the relationship store.
//!
//! Reads the `relationships` table owned by the relationship-data
//! subsystem. The gateway never writes to it.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::PairingStore;
use crate::config::GatewayConfig;
use crate::domain::{Pairing, PairingId, PairingStatus, UserId};
use crate::error::GatewayError;

/// PostgreSQL-backed relationship lookup using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPairingStore {
    pool: PgPool,
}

impl PostgresPairingStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PairingStore`] if the database is unreachable.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(
                config.database_connect_timeout_secs,
            ))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }
}

fn parse_status(raw: &str) -> PairingStatus {
    if raw.eq_ignore_ascii_case("active") {
        PairingStatus::Active
    } else {
        PairingStatus::Ended
    }
}

#[async_trait]
impl PairingStore for PostgresPairingStore {
    async fn active_pairings_for(&self, user_id: &UserId) -> Result<Vec<Pairing>, GatewayError> {
        let rows = sqlx::query_as::<_, (String, String, String, String)>(
            "SELECT id, user_one, user_two, status FROM relationships \
             WHERE status = 'active' AND (user_one = $1 OR user_two = $1) \
             ORDER BY id ASC",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, user_one, user_two, status)| Pairing {
                id: PairingId::new(id),
                member_a: UserId::new(user_one),
                member_b: UserId::new(user_two),
                status: parse_status(&status),
            })
            .collect())
    }
}
