//! API route table.

use axum::routing::{get, patch};
use axum::Router;

use super::handlers::{self, AppState};

/// Build the v2 API router (mounted under `/api/v2`).
pub fn v2_api_routes(state: AppState) -> Router {
    Router::new()
        .route("/reports", get(handlers::list_reports).post(handlers::create_report))
        .route("/reports/:id", get(handlers::get_report))
        .route("/reports/:id/remarks", patch(handlers::annotate_report))
        .route("/profiles", get(handlers::list_profiles))
        .with_state(state)
}

/// Liveness route at the root.
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .with_state(state)
}
