//! Authentication Module
//! Mission: Register identities and issue bearer tokens on successful login

pub mod api;
pub mod errors;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod user_store;

pub use api::AuthState;
pub use errors::AuthError;
pub use jwt::TokenIssuer;
pub use middleware::auth_middleware;
pub use service::{AuthService, LoginStage};
pub use user_store::UserStore;
