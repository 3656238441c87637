mod config;
mod errors;
mod import;
mod models;
mod persistence;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, PersistenceBackend};
use crate::persistence::memory::MemoryJobStore;
use crate::persistence::{HttpJobStore, JobStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting job intake API v{}", env!("CARGO_PKG_VERSION"));

    let store = build_store(&config)?;
    let state = AppState::new(config.clone(), store);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Picks the record server from `PERSISTENCE_BACKEND`.
fn build_store(config: &Config) -> Result<Arc<dyn JobStore>> {
    match config.persistence_backend {
        PersistenceBackend::Http => {
            let url = config
                .persistence_url
                .as_deref()
                .context("PERSISTENCE_URL is required for the http backend")?;
            let store = HttpJobStore::new(
                url,
                config.persistence_api_token.clone(),
                Duration::from_secs(config.persistence_timeout_secs),
            )?;
            info!("Record server: {url}");
            Ok(Arc::new(store))
        }
        PersistenceBackend::Memory => {
            info!("Record server: in-memory store with reference salary bands");
            Ok(Arc::new(MemoryJobStore::with_reference_bands()))
        }
    }
}
