pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::import::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/salary-bands", get(handlers::handle_salary_bands))
        // Manual entry
        .route("/api/v1/jobs", post(handlers::handle_create_job))
        // Bulk import
        .route("/api/v1/jobs/imports", post(handlers::handle_upload))
        .route(
            "/api/v1/jobs/imports/template",
            get(handlers::handle_template),
        )
        .route("/api/v1/jobs/imports/:id", get(handlers::handle_get_import))
        .route(
            "/api/v1/jobs/imports/:id/rows/:row_index",
            patch(handlers::handle_edit_row),
        )
        .route(
            "/api/v1/jobs/imports/:id/confirm",
            post(handlers::handle_confirm),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
