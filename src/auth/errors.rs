//! Authentication Errors
//! Mission: One taxonomy from store to HTTP status, without leaking internals

use crate::auth::models::ErrorBody;
use crate::db::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),
    #[error("username already exists")]
    Conflict,
    /// Lookup miss. Never surfaced on its own from login.
    #[error("user not found")]
    NotFound,
    /// Wrong password or unresolvable identity.
    #[error("invalid username or password")]
    InvalidCredentials,
    /// Missing or invalid bearer token on a protected route.
    #[error("invalid or missing token")]
    Unauthorized,
    #[error("configuration missing: {0}")]
    Config(&'static str),
    #[error("store failure: {0}")]
    Store(StoreError),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AuthError::NotFound,
            StoreError::Duplicate => AuthError::Conflict,
            other => AuthError::Store(other),
        }
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Conflict => StatusCode::CONFLICT,
            AuthError::NotFound | AuthError::InvalidCredentials | AuthError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Config(_)
            | AuthError::Store(_)
            | AuthError::Hashing(_)
            | AuthError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short human-readable category that is safe to put on the wire.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Validation(msg) => msg.clone(),
            AuthError::Conflict => "Username already exists".to_string(),
            // Same text for both so a client cannot probe which usernames exist.
            AuthError::NotFound | AuthError::InvalidCredentials => {
                "Invalid username or password".to_string()
            }
            AuthError::Unauthorized => "Invalid or expired token".to_string(),
            AuthError::Config(_) | AuthError::Hashing(_) | AuthError::Signing(_) => {
                "Internal server error".to_string()
            }
            AuthError::Store(_) => "Database error".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
