//! pairlink-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use pairlink_gateway::app_state::AppState;
use pairlink_gateway::auth::JwtVerifier;
use pairlink_gateway::config::{GatewayConfig, LogFormat, PairingStoreKind};
use pairlink_gateway::pairing::{InMemoryPairingStore, PairingStore, PostgresPairingStore};
use pairlink_gateway::server::{build_app, serve, shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting pairlink-gateway");

    // Build collaborators
    let verifier = Arc::new(JwtVerifier::new(config.jwt_secret.as_bytes()));
    let store: Arc<dyn PairingStore> = match config.pairing_store {
        PairingStoreKind::Memory => {
            tracing::warn!("using in-memory pairing store; every user starts unpaired");
            Arc::new(InMemoryPairingStore::new())
        }
        PairingStoreKind::Postgres => Arc::new(
            PostgresPairingStore::connect(&config)
                .await
                .context("connecting to relationship store")?,
        ),
    };

    // Build application state
    let app_state = AppState::new(&config, verifier, store);
    let app = build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    serve(listener, app, shutdown_signal()).await?;

    tracing::info!("server stopped");
    Ok(())
}
