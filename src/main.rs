use page_builder::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{MemoryRepository, PostgresRepository, Repository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initialises logging, connects the page store and serves
/// the HTTP API.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "page_builder=debug,tower_http=info,axum=trace".into());

    // Pretty output locally, JSON for log aggregation in production.
    match config.env {
        Env::Local => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init(),
        Env::Production => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    let repo: RepositoryState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await?;
            let postgres = PostgresRepository::new(pool);
            postgres.ensure_schema().await?;
            tracing::info!("Postgres page store ready");
            Arc::new(postgres)
        }
        None => {
            let memory = MemoryRepository::seeded();
            for user in memory.list_users().await {
                tracing::info!(
                    "demo account {} ({}) -> x-user-id: {}",
                    user.email,
                    user.role,
                    user.id
                );
            }
            tracing::warn!("DATABASE_URL not set; pages are kept in memory only");
            Arc::new(memory)
        }
    };

    let bind_addr = config.bind_addr;
    let app = create_router(AppState { repo, config });

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
