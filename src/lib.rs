use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Builder core: permissions, section model, grouping, drag-and-drop, session.
pub mod controller;
pub mod grouping;
pub mod models;
pub mod permissions;
pub mod session;

// Service components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod repository;

// Routing split by access tier (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every handler and payload schema, served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_me, handlers::list_users, handlers::get_page,
        handlers::save_page, handlers::render_page, handlers::get_admin_users
    ),
    components(
        schemas(
            models::Section, models::SectionId, models::SectionKind, models::CallToAction,
            models::Layout, models::PageConfig, models::PageResponse, models::RenderedPage,
            models::RenderGroupView, models::User, models::UserSummary, models::UserProfile,
            permissions::Role, permissions::Permission, permissions::Capabilities,
        )
    ),
    tags(
        (name = "page-builder", description = "Role-gated page builder API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared state handed to every request: the persistence adapter and the
/// immutable configuration.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// Correlation header generated for every request and echoed on the response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Rejects the request with 401 before the handler runs when `AuthUser` cannot
/// be resolved.
async fn require_identity(_caller: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Builder API routes plus the documentation endpoints, wrapped in the request-id,
/// tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let builder_api = authenticated::authenticated_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_identity));

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(builder_api)
        // Role check for '/admin' happens inside the handlers.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    with_service_layers(app)
}

fn with_service_layers(app: Router) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let observability = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(tower_http::LatencyUnit::Millis),
                ),
        )
        .layer(PropagateRequestIdLayer::new(request_id));

    // The builder front end is served from a different origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    app.layer(observability).layer(cors)
}

/// Per-request span; every log line of one request carries its `x-request-id`.
fn request_span(request: &axum::http::Request<axum::body::Body>) -> Span {
    let req_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        req_id,
    )
}
