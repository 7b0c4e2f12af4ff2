use std::{env, net::SocketAddr};

use crate::error::ConfigError;

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// AppConfig
///
/// Immutable configuration loaded once at startup and shared through `AppState`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` locally means the in-memory store is used.
    pub db_url: Option<String>,
    // Runtime environment marker. Controls the `x-user-id` development bypass.
    pub env: Env,
    // Secret used to validate incoming HS256 JWTs.
    pub jwt_secret: String,
    // Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
}

/// Env
///
/// Local development versus hardened production.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Test configuration: local env, in-memory store, known secret.
    fn default() -> Self {
        Self {
            db_url: None,
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the environment. Production fails fast when
    /// `DATABASE_URL` or `JWT_SECRET` is missing; local falls back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let db_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        let jwt_secret = env::var("JWT_SECRET").ok().filter(|secret| !secret.is_empty());

        let (db_url, jwt_secret) = match env {
            Env::Production => (
                Some(db_url.ok_or(ConfigError::MissingVar("DATABASE_URL"))?),
                jwt_secret.ok_or(ConfigError::MissingVar("JWT_SECRET"))?,
            ),
            Env::Local => (
                db_url,
                jwt_secret.unwrap_or_else(|| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        let bind_raw = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidVar {
                name: "BIND_ADDR",
                value: bind_raw.clone(),
            })?;

        Ok(Self {
            db_url,
            env,
            jwt_secret,
            bind_addr,
        })
    }
}
