use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Builder endpoints for any signed-in user. Each handler receives a validated
/// `AuthUser` and applies the role rules for its action.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // Profile, permission set and capability flags of the signed-in user.
        .route("/me", get(handlers::get_me))
        // GET /users
        // Target-user selector entries. Hidden from VIEWER.
        .route("/users", get(handlers::list_users))
        // GET/PUT /pages/{user_id}
        // Load or wholesale-replace a target user's page configuration.
        // Saving is rejected for VIEWER by the repository layer.
        .route(
            "/pages/{user_id}",
            get(handlers::get_page).put(handlers::save_page),
        )
        // GET /pages/{user_id}/render?cardsPerRow=
        // Page sections grouped into hero blocks and card grids.
        .route("/pages/{user_id}/render", get(handlers::render_page))
}
