use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
};
use chrono::Utc;
use page_builder::{
    AppState, create_router,
    auth::{AuthUser, DEV_USER_HEADER},
    config::AppConfig,
    handlers::{self, RenderQuery},
    models::{
        Layout, PageConfig, PageResponse, RenderGroupView, RenderedPage, Section, SectionId,
        SectionKind, User, UserProfile,
    },
    permissions::{Permission, Role},
    repository::{MemoryRepository, Repository},
};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

// --- Test Utilities ---

const ADMIN_ID: Uuid = Uuid::from_u128(1);
const EDITOR_ID: Uuid = Uuid::from_u128(2);
const VIEWER_ID: Uuid = Uuid::from_u128(3);

fn user(id: Uuid, email: &str, role: Role) -> User {
    User {
        id,
        email: email.to_string(),
        name: Some(role.to_string()),
        role,
        created_at: Utc::now(),
    }
}

fn create_test_state() -> (AppState, Arc<MemoryRepository>) {
    let repo = Arc::new(MemoryRepository::with_users([
        user(ADMIN_ID, "admin@test.com", Role::Admin),
        user(EDITOR_ID, "editor@test.com", Role::Editor),
        user(VIEWER_ID, "user@test.com", Role::Viewer),
    ]));
    let state = AppState {
        repo: repo.clone(),
        config: AppConfig::default(),
    };
    (state, repo)
}

fn auth(id: Uuid, role: Role) -> AuthUser {
    AuthUser { id, role }
}

fn card(id: &str) -> Section {
    Section::with_defaults(SectionKind::Card, SectionId::from(id))
}

fn hero(id: &str) -> Section {
    Section::with_defaults(SectionKind::Hero, SectionId::from(id))
}

fn mixed_page() -> PageConfig {
    PageConfig {
        sections: vec![card("c1"), card("c2"), hero("h1"), card("c3")],
        layout: Layout { cards_per_row: 2 },
    }
}

// --- Direct Handler Tests ---

#[tokio::test]
async fn test_get_me_reports_capabilities() {
    let (state, _) = create_test_state();

    let Json(profile) = handlers::get_me(auth(EDITOR_ID, Role::Editor), State(state))
        .await
        .unwrap();

    assert_eq!(profile.role, Role::Editor);
    assert_eq!(
        profile.permissions,
        [Permission::Create, Permission::Edit, Permission::View]
    );
    assert!(profile.capabilities.can_edit);
    assert!(!profile.capabilities.can_delete);
}

#[tokio::test]
async fn test_list_users_forbidden_for_viewer() {
    let (state, _) = create_test_state();

    let result = handlers::list_users(auth(VIEWER_ID, Role::Viewer), State(state)).await;

    assert_eq!(result.unwrap_err(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_users_for_editor() {
    let (state, _) = create_test_state();

    let Json(users) = handlers::list_users(auth(EDITOR_ID, Role::Editor), State(state))
        .await
        .unwrap();

    assert_eq!(users.len(), 3);
    assert_eq!(users[0].id, ADMIN_ID);
}

#[tokio::test]
async fn test_get_page_without_saved_config() {
    let (state, _) = create_test_state();

    let Json(response) =
        handlers::get_page(auth(ADMIN_ID, Role::Admin), State(state), Path(VIEWER_ID))
            .await
            .unwrap();

    assert_eq!(response.user_id, VIEWER_ID);
    assert!(response.config.is_none());
}

#[tokio::test]
async fn test_viewer_reads_only_own_page() {
    let (state, _) = create_test_state();

    let own = handlers::get_page(
        auth(VIEWER_ID, Role::Viewer),
        State(state.clone()),
        Path(VIEWER_ID),
    )
    .await;
    assert!(own.is_ok());

    let other =
        handlers::get_page(auth(VIEWER_ID, Role::Viewer), State(state), Path(EDITOR_ID)).await;
    assert_eq!(other.unwrap_err(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_save_page_by_viewer_is_forbidden() {
    let (state, repo) = create_test_state();

    let result = handlers::save_page(
        auth(VIEWER_ID, Role::Viewer),
        State(state),
        Path(VIEWER_ID),
        Json(mixed_page()),
    )
    .await;

    assert_eq!(result.unwrap_err(), StatusCode::FORBIDDEN);
    assert!(repo.get_page(VIEWER_ID).await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_page_by_editor_for_other_user() {
    let (state, repo) = create_test_state();

    let status = handlers::save_page(
        auth(EDITOR_ID, Role::Editor),
        State(state),
        Path(VIEWER_ID),
        Json(mixed_page()),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(repo.get_page(VIEWER_ID).await.unwrap(), Some(mixed_page()));
}

#[tokio::test]
async fn test_save_page_unknown_user() {
    let (state, _) = create_test_state();

    let result = handlers::save_page(
        auth(ADMIN_ID, Role::Admin),
        State(state),
        Path(Uuid::new_v4()),
        Json(mixed_page()),
    )
    .await;

    assert_eq!(result.unwrap_err(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_save_page_rejects_invalid_config() {
    let (state, _) = create_test_state();

    let duplicate = PageConfig {
        sections: vec![card("same"), hero("same")],
        layout: Layout::default(),
    };
    let result = handlers::save_page(
        auth(ADMIN_ID, Role::Admin),
        State(state.clone()),
        Path(ADMIN_ID),
        Json(duplicate),
    )
    .await;
    assert_eq!(result.unwrap_err(), StatusCode::UNPROCESSABLE_ENTITY);

    let zero_columns = PageConfig {
        sections: vec![],
        layout: Layout { cards_per_row: 0 },
    };
    let result = handlers::save_page(
        auth(ADMIN_ID, Role::Admin),
        State(state),
        Path(ADMIN_ID),
        Json(zero_columns),
    )
    .await;
    assert_eq!(result.unwrap_err(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_render_page_groups_sections() {
    let (state, repo) = create_test_state();
    repo.save_page(Role::Admin, EDITOR_ID, &mixed_page())
        .await
        .unwrap();

    let Json(rendered) = handlers::render_page(
        auth(EDITOR_ID, Role::Editor),
        State(state),
        Path(EDITOR_ID),
        Query(RenderQuery {
            cards_per_row: None,
        }),
    )
    .await
    .unwrap();

    assert!(!rendered.is_empty);
    assert_eq!(rendered.groups.len(), 3);
    match &rendered.groups[0] {
        RenderGroupView::Cards { columns, sections } => {
            assert_eq!(*columns, 2);
            assert_eq!(sections.len(), 2);
        }
        other => panic!("expected a card grid, got {other:?}"),
    }
    assert!(matches!(rendered.groups[1], RenderGroupView::Hero { .. }));
}

#[tokio::test]
async fn test_render_page_query_overrides_layout() {
    let (state, repo) = create_test_state();
    repo.save_page(Role::Admin, ADMIN_ID, &mixed_page())
        .await
        .unwrap();

    let Json(rendered) = handlers::render_page(
        auth(ADMIN_ID, Role::Admin),
        State(state),
        Path(ADMIN_ID),
        Query(RenderQuery {
            cards_per_row: Some(7),
        }),
    )
    .await
    .unwrap();

    // Unsupported values fall back to a single column.
    assert!(matches!(
        rendered.groups[0],
        RenderGroupView::Cards { columns: 1, .. }
    ));
}

#[tokio::test]
async fn test_render_empty_page() {
    let (state, _) = create_test_state();

    let Json(rendered) = handlers::render_page(
        auth(VIEWER_ID, Role::Viewer),
        State(state),
        Path(VIEWER_ID),
        Query(RenderQuery {
            cards_per_row: None,
        }),
    )
    .await
    .unwrap();

    assert!(rendered.is_empty);
    assert!(rendered.groups.is_empty());
}

#[tokio::test]
async fn test_get_admin_users_forbidden() {
    let (state, _) = create_test_state();

    let result = handlers::get_admin_users(auth(EDITOR_ID, Role::Editor), State(state)).await;

    assert_eq!(result.unwrap_err(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_admin_users_success() {
    let (state, _) = create_test_state();

    let Json(users) = handlers::get_admin_users(auth(ADMIN_ID, Role::Admin), State(state))
        .await
        .unwrap();

    assert_eq!(users.len(), 3);
    assert_eq!(users[2].role, Role::Viewer);
}

// --- Router Tests ---

fn request(method: &str, uri: &str, user_id: Option<Uuid>, body: Option<&PageConfig>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user_id {
        builder = builder.header(DEV_USER_HEADER, user_id.to_string());
    }
    match body {
        Some(config) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(config).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_router_health_is_public() {
    let (state, _) = create_test_state();
    let response = create_router(state)
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_router_requires_identity() {
    let (state, _) = create_test_state();
    let response = create_router(state)
        .oneshot(request("GET", "/me", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_router_me_with_dev_header() {
    let (state, _) = create_test_state();
    let response = create_router(state)
        .oneshot(request("GET", "/me", Some(ADMIN_ID), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let profile: UserProfile = body_json(response).await;
    assert_eq!(profile.role, Role::Admin);
    assert!(profile.capabilities.can_delete);
}

#[tokio::test]
async fn test_router_save_then_load() {
    let (state, _) = create_test_state();
    let app = create_router(state);
    let uri = format!("/pages/{}", VIEWER_ID);

    let saved = app
        .clone()
        .oneshot(request("PUT", &uri, Some(EDITOR_ID), Some(&mixed_page())))
        .await
        .unwrap();
    assert_eq!(saved.status(), StatusCode::NO_CONTENT);

    let loaded = app
        .oneshot(request("GET", &uri, Some(VIEWER_ID), None))
        .await
        .unwrap();
    assert_eq!(loaded.status(), StatusCode::OK);
    let response: PageResponse = body_json(loaded).await;
    assert_eq!(response.config, Some(mixed_page()));
}

#[tokio::test]
async fn test_router_viewer_save_forbidden() {
    let (state, _) = create_test_state();
    let response = create_router(state)
        .oneshot(request(
            "PUT",
            &format!("/pages/{}", VIEWER_ID),
            Some(VIEWER_ID),
            Some(&mixed_page()),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_router_render_with_query() {
    let (state, repo) = create_test_state();
    repo.save_page(Role::Admin, VIEWER_ID, &mixed_page())
        .await
        .unwrap();

    let response = create_router(state)
        .oneshot(request(
            "GET",
            &format!("/pages/{}/render?cardsPerRow=3", VIEWER_ID),
            Some(VIEWER_ID),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let rendered: RenderedPage = body_json(response).await;
    assert_eq!(rendered.groups.len(), 3);
    assert!(matches!(
        rendered.groups[2],
        RenderGroupView::Cards { columns: 3, .. }
    ));
}

#[tokio::test]
async fn test_router_render_with_oversized_cards_per_row() {
    let (state, repo) = create_test_state();
    repo.save_page(Role::Admin, VIEWER_ID, &mixed_page())
        .await
        .unwrap();

    let response = create_router(state)
        .oneshot(request(
            "GET",
            &format!("/pages/{}/render?cardsPerRow=300", VIEWER_ID),
            Some(VIEWER_ID),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let rendered: RenderedPage = body_json(response).await;
    assert!(matches!(
        rendered.groups[0],
        RenderGroupView::Cards { columns: 1, .. }
    ));
}

#[tokio::test]
async fn test_router_admin_routes() {
    let (state, _) = create_test_state();
    let app = create_router(state);

    let denied = app
        .clone()
        .oneshot(request("GET", "/admin/users", Some(EDITOR_ID), None))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let allowed = app
        .oneshot(request("GET", "/admin/users", Some(ADMIN_ID), None))
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
    let users: Vec<User> = body_json(allowed).await;
    assert_eq!(users.len(), 3);
}
