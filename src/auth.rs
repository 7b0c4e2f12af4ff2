use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    models::User,
    permissions::{Capabilities, Role},
    repository::RepositoryState,
    session::SessionContext,
};

/// Header accepted in `Env::Local` in place of a bearer token.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of the JWT issued by the external identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's UUID, used to look up the stored role.
    pub sub: Uuid,
    /// Expiration Time (exp).
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthUser
///
/// Resolved identity of an authenticated request. The role is always read from
/// the repository, never from the token, so role changes apply on the next request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_role(self.role)
    }

    pub fn context(&self) -> SessionContext {
        SessionContext::new(self.id, self.role)
    }
}

/// The `x-user-id` value, when present and a well-formed UUID.
fn dev_user_id(parts: &Parts) -> Option<Uuid> {
    parts
        .headers
        .get(DEV_USER_HEADER)?
        .to_str()
        .ok()
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Validates an HS256 token and returns its subject. Expiry is enforced.
fn verify_token(token: &str, secret: &str) -> Result<Uuid, StatusCode> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims.sub)
        .map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                _ => tracing::debug!("rejected invalid token: {}", e),
            }
            StatusCode::UNAUTHORIZED
        })
}

/// AuthUser Extractor Implementation
///
/// 1. Local bypass: in `Env::Local`, a known UUID in `x-user-id` authenticates directly.
/// 2. Bearer token extraction and HS256 JWT validation.
/// 3. Repository lookup of the user's current role. The token may outlive the account.
///
/// Rejection: `StatusCode::UNAUTHORIZED` on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let bypass = match config.env {
            Env::Local => dev_user_id(parts),
            Env::Production => None,
        };
        if let Some(user_id) = bypass {
            if let Some(user) = repo.get_user(user_id).await {
                return Ok(AuthUser::from(&user));
            }
        }

        let token = bearer_token(parts).ok_or(StatusCode::UNAUTHORIZED)?;
        let subject = verify_token(token, &config.jwt_secret)?;

        repo.get_user(subject)
            .await
            .map(|user| AuthUser::from(&user))
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }
}
