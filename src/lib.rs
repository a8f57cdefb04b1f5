//! Credential Service Library
//!
//! Registers accounts and issues bearer tokens on successful login.
//! Exposes every module so the binary and the integration tests share one
//! wiring path.

pub mod auth;
pub mod config;
pub mod db;
pub mod middleware;
pub mod routes;

use anyhow::Result;
use std::sync::Arc;

use crate::auth::{AuthService, AuthState, TokenIssuer, UserStore};
use crate::config::Config;
use crate::db::{SqliteUserRepository, UserRepository};

pub use routes::build_router;

/// Assemble the auth state from an already-connected store client.
pub fn build_state(repo: Arc<dyn UserRepository>, jwt_secret: Option<String>) -> AuthState {
    let users = UserStore::new(repo);
    let tokens = TokenIssuer::new(jwt_secret);
    AuthState::new(AuthService::new(users, tokens))
}

/// Connect the SQLite store described by `config` and build the auth state.
pub fn state_from_config(config: &Config) -> Result<AuthState> {
    let repo = SqliteUserRepository::connect(&config.database_url, config.pool_options())?;
    Ok(build_state(Arc::new(repo), config.jwt_secret.clone()))
}
