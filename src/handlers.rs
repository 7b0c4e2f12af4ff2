use crate::{
    AppState,
    auth::AuthUser,
    grouping::group_sections,
    models::{PageConfig, PageResponse, RenderedPage, User, UserProfile, UserSummary},
    permissions::{Role, permissions_for},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

// --- Query Structs ---

/// RenderQuery
///
/// Optional override of the stored cards-per-row, used by the layout picker preview.
/// Any non-negative value is accepted; unsupported ones render as a single column.
#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RenderQuery {
    pub cards_per_row: Option<u32>,
}

impl RenderQuery {
    /// Out-of-range values saturate, which the grouping engine maps to one column.
    fn cards_per_row_override(&self) -> Option<u8> {
        self.cards_per_row
            .map(|value| u8::try_from(value).unwrap_or(u8::MAX))
    }
}

/// Every user may read their own page; only page managers may read other users' pages.
fn can_read_page(user: &AuthUser, target: Uuid) -> bool {
    user.id == target || user.capabilities().manages_pages()
}

async fn load_page(state: &AppState, user_id: Uuid) -> Result<Option<PageConfig>, StatusCode> {
    state.repo.get_page(user_id).await.map_err(|e| {
        tracing::error!(%user_id, "get_page error: {}", e);
        StatusCode::from(e)
    })
}

// --- Handlers ---

/// get_me
///
/// [Authenticated Route] The signed-in user's profile plus the permission set and
/// capability flags the client composes the builder view from.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, StatusCode> {
    let user = state
        .repo
        .get_user(auth.id)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;

    Ok(Json(UserProfile {
        id: user.id,
        email: user.email,
        name: user.name,
        role: user.role,
        permissions: permissions_for(user.role).to_vec(),
        capabilities: auth.capabilities(),
    }))
}

/// list_users
///
/// [Authenticated Route] Entries of the target-user selector. Hidden from VIEWER.
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "Selectable users", body = [UserSummary]),
        (status = 403, description = "Viewer")
    )
)]
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserSummary>>, StatusCode> {
    if !auth.capabilities().manages_pages() {
        return Err(StatusCode::FORBIDDEN);
    }
    let users = state.repo.list_users().await;
    Ok(Json(users.iter().map(UserSummary::from).collect()))
}

/// get_page
///
/// [Authenticated Route] Loads a target user's page. `config` is null when the user
/// never saved one; the client then starts from an empty page.
#[utoipa::path(
    get,
    path = "/pages/{user_id}",
    params(("user_id" = Uuid, Path, description = "Target user ID")),
    responses(
        (status = 200, description = "Page configuration", body = PageResponse),
        (status = 403, description = "Not allowed to read this page")
    )
)]
pub async fn get_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PageResponse>, StatusCode> {
    if !can_read_page(&auth, user_id) {
        return Err(StatusCode::FORBIDDEN);
    }
    let config = load_page(&state, user_id).await?;
    Ok(Json(PageResponse { user_id, config }))
}

/// save_page
///
/// [Authenticated Route] Replaces a target user's page wholesale.
///
/// *Authorization*: enforced by the repository, which rejects VIEWER actors (403).
#[utoipa::path(
    put,
    path = "/pages/{user_id}",
    params(("user_id" = Uuid, Path, description = "Target user ID")),
    request_body = PageConfig,
    responses(
        (status = 204, description = "Saved"),
        (status = 403, description = "Viewer"),
        (status = 404, description = "Unknown target user"),
        (status = 422, description = "Invalid page configuration")
    )
)]
pub async fn save_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(config): Json<PageConfig>,
) -> Result<StatusCode, StatusCode> {
    if let Err(e) = config.validate() {
        tracing::debug!(%user_id, "rejected page: {}", e);
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    state
        .repo
        .save_page(auth.role, user_id, &config)
        .await
        .map_err(StatusCode::from)?;

    tracing::info!(%user_id, actor = %auth.id, sections = config.sections.len(), "page saved");
    Ok(StatusCode::NO_CONTENT)
}

/// render_page
///
/// [Authenticated Route] Groups a page's sections for display: heroes full-width,
/// consecutive cards batched into grids.
#[utoipa::path(
    get,
    path = "/pages/{user_id}/render",
    params(("user_id" = Uuid, Path, description = "Target user ID"), RenderQuery),
    responses(
        (status = 200, description = "Render groups", body = RenderedPage),
        (status = 403, description = "Not allowed to read this page")
    )
)]
pub async fn render_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<RenderQuery>,
) -> Result<Json<RenderedPage>, StatusCode> {
    if !can_read_page(&auth, user_id) {
        return Err(StatusCode::FORBIDDEN);
    }
    let config = load_page(&state, user_id).await?.unwrap_or_default();
    let cards_per_row = query.cards_per_row_override().unwrap_or(config.layout.cards_per_row);

    let plan = group_sections(&config.sections, cards_per_row);
    Ok(Json(RenderedPage::from(&plan)))
}

/// get_admin_users
///
/// [Admin Route] Full user list with roles.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_users(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, StatusCode> {
    if role != Role::Admin {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.list_users().await))
}
