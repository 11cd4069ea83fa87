use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Why an [`AppError::Unauthorized`] was raised. Only the HTTP status differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No usable identity on the request.
    SignedOut,
    /// Identity present but lacking the rights for the operation.
    NotPermitted,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized: {1}")]
    Unauthorized(Denial, String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Player is already signed up for this match")]
    DuplicateSignup,

    #[error("Match is full")]
    MatchFull,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable tag carried in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(..) | AppError::Jwt(_) => "unauthorized",
            AppError::Validation(_) => "validation_error",
            AppError::DuplicateSignup => "duplicate_signup",
            AppError::MatchFull => "match_full",
            AppError::NotFound(_) => "not_found",
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Redis(_)
            | AppError::Internal(_) => "unexpected",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(Denial::SignedOut, _) | AppError::Jwt(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Unauthorized(Denial::NotPermitted, _) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DuplicateSignup | AppError::MatchFull => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Unauthorized(_, msg)
            | AppError::Validation(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::DuplicateSignup | AppError::MatchFull => self.to_string(),
            AppError::Jwt(_) => "Invalid token".to_string(),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                "Internal server error".to_string()
            }
            AppError::Migration(e) => {
                tracing::error!("Migration error: {e}");
                "Internal server error".to_string()
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {e}");
                "Internal server error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                "Internal server error".to_string()
            }
        };

        let body = json!({ "error": message, "code": self.code() });
        (self.status(), Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Postgres SQLSTATE for unique_violation.
pub(crate) const UNIQUE_VIOLATION: &str = "23505";

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_and_tag() {
        assert_eq!(AppError::DuplicateSignup.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::DuplicateSignup.code(), "duplicate_signup");
        let denied = AppError::Unauthorized(Denial::NotPermitted, "x".into());
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
        assert_eq!(denied.code(), "unauthorized");
        let signed_out = AppError::Unauthorized(Denial::SignedOut, "x".into());
        assert_eq!(signed_out.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(signed_out.code(), "unauthorized");
        assert_eq!(AppError::Validation("x".into()).code(), "validation_error");
        assert_eq!(AppError::Internal("boom".into()).code(), "unexpected");
        assert_eq!(AppError::NotFound("m".into()).status(), StatusCode::NOT_FOUND);
    }
}
