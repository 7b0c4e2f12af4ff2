use axum::http::StatusCode;
use uuid::Uuid;

use crate::{models::SectionId, permissions::PermissionDenied};

/// ValidationError
///
/// A page configuration that must not be persisted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("duplicate section id: {0}")]
    DuplicateSectionId(SectionId),

    #[error("cards per row must be positive, got {0}")]
    InvalidCardsPerRow(u8),
}

/// RepositoryError
///
/// Failures surfaced by the persistence adapter on load and save paths.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("user not found: {0}")]
    UserNotFound(Uuid),

    #[error("forbidden: {0}")]
    Forbidden(#[from] PermissionDenied),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<RepositoryError> for StatusCode {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UserNotFound(_) => StatusCode::NOT_FOUND,
            RepositoryError::Forbidden(_) => StatusCode::FORBIDDEN,
            RepositoryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// BuilderError
///
/// Errors returned by the builder session at its permission and save boundaries.
/// Not-found section identities are never errors; they are silent no-ops.
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error(transparent)]
    Forbidden(#[from] PermissionDenied),

    #[error("role {0} cannot perform this action")]
    NotAllowed(crate::permissions::Role),

    #[error("a save is already in progress")]
    SaveInProgress,

    #[error("no target user selected")]
    NoTargetSelected,

    #[error("the selected page is still loading")]
    LoadInProgress,

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

/// ConfigError
///
/// Missing or malformed environment configuration detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}
