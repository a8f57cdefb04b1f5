//! Authentication API Endpoints
//! Mission: Provide register, login and identity endpoints

use crate::auth::{
    errors::AuthError,
    middleware::extract_claims,
    models::{CredentialsRequest, LoginResponse, MeResponse, RegisterResponse},
    service::AuthService,
};
use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, warn};

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub service: AuthService,
}

impl AuthState {
    pub fn new(service: AuthService) -> Self {
        Self { service }
    }
}

/// Any body that fails to parse as `{username, password}` is a 400.
fn parse_body(
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<CredentialsRequest, AuthError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        debug!(reason = %rejection.body_text(), "Rejected request body");
        AuthError::Validation("Invalid request".to_string())
    })
}

/// Register endpoint - POST /register
pub async fn register(
    State(state): State<AuthState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, AuthError> {
    let payload = parse_body(payload)?;

    let user = state
        .service
        .register(&payload.username, &payload.password)
        .await?;

    Ok(Json(RegisterResponse::from_record(&user)))
}

/// Login endpoint - POST /login
pub async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthError> {
    let payload = parse_body(payload)?;
    debug!(username = %payload.username, "Login attempt");

    let outcome = state
        .service
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        token: outcome.token,
        expires_in: outcome.expires_in,
    }))
}

/// Current identity - GET /me
/// Answered from the validated token alone, no store lookup.
pub async fn get_current_user(req: Request) -> Result<Json<MeResponse>, AuthError> {
    let claims = extract_claims(&req).ok_or(AuthError::Unauthorized)?;
    let id = claims.identity_id().ok_or(AuthError::Unauthorized)?;

    Ok(Json(MeResponse {
        id,
        exp: claims.exp,
    }))
}

/// Welcome banner - GET /
pub async fn root() -> &'static str {
    "Welcome to the credential service!"
}

/// Liveness plus a store round-trip - GET /health
pub async fn health(State(state): State<AuthState>) -> Response {
    match state.service.users().repository().ping().await {
        Ok(()) => Json(json!({ "status": "ok" })).into_response(),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
                .into_response()
        }
    }
}
