use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::Config;
use crate::import::preview::ImportSessions;
use crate::models::salary_band::SalaryBandTable;
use crate::persistence::JobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Record server. `HttpJobStore` in production, `MemoryJobStore` locally.
    pub store: Arc<dyn JobStore>,
    /// Open upload previews awaiting confirmation.
    pub imports: Arc<ImportSessions>,
    /// Band table, loaded on first use.
    pub bands: Arc<OnceCell<Arc<SalaryBandTable>>>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn JobStore>) -> Self {
        let imports = Arc::new(ImportSessions::new(config.import_session_ttl_minutes));
        Self {
            config,
            store,
            imports,
            bands: Arc::new(OnceCell::new()),
        }
    }
}

#[cfg(test)]
pub fn test_state(store: Arc<dyn JobStore>) -> AppState {
    use crate::config::PersistenceBackend;

    AppState::new(
        Config {
            persistence_backend: PersistenceBackend::Memory,
            persistence_url: None,
            persistence_api_token: None,
            persistence_timeout_secs: 60,
            preview_row_limit: 5,
            max_upload_bytes: 10 * 1024 * 1024,
            import_session_ttl_minutes: 30,
            port: 8080,
            rust_log: "info".to_string(),
        },
        store,
    )
}
