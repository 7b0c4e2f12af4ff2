use crate::AppState;
use axum::{Router, routing::get};

/// Public Router Module
///
/// Unauthenticated endpoints. Only the health probe lives here; every page
/// endpoint requires a resolved identity.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
}
