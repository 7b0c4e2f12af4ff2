use crate::{
    error::RepositoryError,
    models::{PageConfig, User},
    permissions::{Permission, Role, require_permission},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, types::Json};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Schema applied by `PostgresRepository::ensure_schema` at startup.
const SCHEMA: &str = include_str!("../migrations/0001_page_builder.sql");

// Postgres `foreign_key_violation`: the target user row does not exist.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Repository Trait
///
/// Abstract contract for the persistence adapter. Handlers and the builder
/// session only ever see `Arc<dyn Repository>`, so the Postgres store and the
/// in-memory store are interchangeable.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    // Ordered by email, for the target-user selector.
    async fn list_users(&self) -> Vec<User>;

    // --- Page Configurations ---
    // `Ok(None)` when the user has never saved a page.
    async fn get_page(&self, user_id: Uuid) -> Result<Option<PageConfig>, RepositoryError>;
    // Full replace. VIEWER actors are rejected before storage is touched.
    async fn save_page(
        &self,
        actor: Role,
        user_id: Uuid,
        config: &PageConfig,
    ) -> Result<(), RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Authorization check shared by every `save_page` implementation.
fn authorize_save(actor: Role) -> Result<(), RepositoryError> {
    require_permission(actor, Permission::Edit).map_err(|denied| {
        tracing::warn!(role = %actor, "page save rejected");
        RepositoryError::from(denied)
    })
}

// --- Postgres ---

/// UserRow
///
/// Raw `users` row. The role column is text and is parsed into `Role`.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Option<User> {
        match self.role.parse::<Role>() {
            Ok(role) => Some(User {
                id: self.id,
                email: self.email,
                name: self.name,
                role,
                created_at: self.created_at,
            }),
            Err(e) => {
                tracing::error!(user_id = %self.id, "skipping user with {}", e);
                None
            }
        }
    }
}

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Page configurations live in
/// `page_builders.content` as JSONB, one row per user.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// ensure_schema
    ///
    /// Creates the `users` and `page_builders` tables when missing. Idempotent.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, email, name, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_user error: {:?}", e);
            None
        })
        .and_then(UserRow::into_user)
    }

    async fn list_users(&self) -> Vec<User> {
        match sqlx::query_as::<_, UserRow>(
            "SELECT id, email, name, role, created_at FROM users ORDER BY email ASC",
        )
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows.into_iter().filter_map(UserRow::into_user).collect(),
            Err(e) => {
                tracing::error!("list_users error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_page(&self, user_id: Uuid) -> Result<Option<PageConfig>, RepositoryError> {
        let content = sqlx::query_scalar::<_, Json<PageConfig>>(
            "SELECT content FROM page_builders WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(content.map(|Json(config)| config))
    }

    /// save_page
    ///
    /// Upserts the whole configuration. A missing user surfaces as a foreign key
    /// violation and is mapped to `UserNotFound`.
    async fn save_page(
        &self,
        actor: Role,
        user_id: Uuid,
        config: &PageConfig,
    ) -> Result<(), RepositoryError> {
        authorize_save(actor)?;

        let result = sqlx::query(
            r#"
            INSERT INTO page_builders (user_id, content, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET content = EXCLUDED.content, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(Json(config))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) =>
            {
                Err(RepositoryError::UserNotFound(user_id))
            }
            Err(e) => {
                tracing::error!("save_page error: {:?}", e);
                Err(e.into())
            }
        }
    }
}

// --- In-Memory ---

/// MemoryRepository
///
/// `Repository` kept entirely in process memory. Used for local development when
/// no `DATABASE_URL` is configured, and as the store behind the router tests.
#[derive(Default)]
pub struct MemoryRepository {
    users: RwLock<HashMap<Uuid, User>>,
    pages: RwLock<HashMap<Uuid, PageConfig>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let users = users.into_iter().map(|user| (user.id, user)).collect();
        Self {
            users: RwLock::new(users),
            pages: RwLock::new(HashMap::new()),
        }
    }

    /// seeded
    ///
    /// One account per role, matching the demo accounts of the hosted builder.
    pub fn seeded() -> Self {
        let now = Utc::now();
        let demo = |email: &str, name: &str, role: Role| User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: Some(name.to_string()),
            role,
            created_at: now,
        };
        Self::with_users([
            demo("admin@test.com", "Admin", Role::Admin),
            demo("editor@test.com", "Editor", Role::Editor),
            demo("user@test.com", "User", Role::Viewer),
        ])
    }

    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.users.read().await.get(&id).cloned()
    }

    async fn list_users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        users
    }

    async fn get_page(&self, user_id: Uuid) -> Result<Option<PageConfig>, RepositoryError> {
        Ok(self.pages.read().await.get(&user_id).cloned())
    }

    async fn save_page(
        &self,
        actor: Role,
        user_id: Uuid,
        config: &PageConfig,
    ) -> Result<(), RepositoryError> {
        authorize_save(actor)?;

        if !self.users.read().await.contains_key(&user_id) {
            return Err(RepositoryError::UserNotFound(user_id));
        }
        self.pages.write().await.insert(user_id, config.clone());
        Ok(())
    }
}
