use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Endpoints for the ADMIN role. The role check runs inside each handler after
/// the `AuthUser` extractor has resolved the caller.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users
        // Every user with email and role.
        .route("/users", get(handlers::get_admin_users))
}
