use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::session::service::SessionService;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub session_service: Arc<SessionService>,
}

impl AppState {
    pub fn new(session_service: Arc<SessionService>) -> Self {
        Self { session_service }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown identifier and wrong password share this variant
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email address has not been verified")]
    EmailNotVerified,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token not found or revoked")]
    TokenNotFoundOrRevoked,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("User already exists")]
    DuplicateUser,

    #[error("Weak password: {0}")]
    WeakPassword(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Refresh token already exists")]
    TokenCollision,

    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    Internal,
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

/// True when the store rejected a write on a uniqueness constraint
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidCredentials
            | AppError::InvalidToken
            | AppError::TokenNotFoundOrRevoked
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::EmailNotVerified | AppError::PermissionDenied => StatusCode::FORBIDDEN,
            AppError::DuplicateUser | AppError::TokenCollision => StatusCode::CONFLICT,
            AppError::WeakPassword(_) => StatusCode::BAD_REQUEST,
            AppError::UserNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::JwtError(_)
            | AppError::DatabaseError(_)
            | AppError::Config(_)
            | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Persistence details stay in the logs
        let error_message = match self {
            AppError::JwtError(_) | AppError::DatabaseError(_) | AppError::Config(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::InvalidCredentials, StatusCode::UNAUTHORIZED)]
    #[case(AppError::EmailNotVerified, StatusCode::FORBIDDEN)]
    #[case(AppError::DuplicateUser, StatusCode::CONFLICT)]
    #[case(AppError::WeakPassword("too short".to_string()), StatusCode::BAD_REQUEST)]
    #[case(AppError::JwtError("signing failed".to_string()), StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(AppError::Config("JWT_SECRET is not set".to_string()), StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(AppError::DatabaseError("connection reset".to_string()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_error_status_mapping(#[case] error: AppError, #[case] expected: StatusCode) {
        assert_eq!(error.into_response().status(), expected);
    }

    #[tokio::test]
    async fn test_server_side_failures_hide_details() {
        let response = AppError::JwtError("key rejected".to_string()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(body["error"], "Internal server error");
    }
}
