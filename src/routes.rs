//! Route table.

use crate::auth::{api as auth_api, auth_middleware, AuthState};
use crate::middleware::request_logging;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

/// Build the full application router. Methods other than the ones listed
/// on a path are answered with 405 by axum's method routing.
pub fn build_router(state: AuthState) -> Router {
    let issuer = state.service.tokens().clone();

    let public_routes = Router::new()
        .route("/", get(auth_api::root))
        .route("/health", get(auth_api::health))
        .route("/register", post(auth_api::register))
        .route("/login", post(auth_api::login));

    let protected_routes = Router::new()
        .route("/me", get(auth_api::get_current_user))
        .route_layer(middleware::from_fn_with_state(issuer, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}
