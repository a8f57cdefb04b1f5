//! Authentication Models
//! Mission: Define identity records, token claims and wire bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Durable row representing one registered user. Immutable once stored.
#[derive(Clone, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub created_at: DateTime<Utc>,
}

// Hand-written so the hash never reaches a log line through `{:?}`.
impl fmt::Debug for IdentityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // subject (identity id)
    pub user_id: i64,
    pub iat: usize,
    pub exp: usize, // expiration timestamp
}

impl Claims {
    /// Identity id the token asserts, cross-checked against `sub`.
    pub fn identity_id(&self) -> Option<i64> {
        let sub: i64 = self.sub.parse().ok()?;
        (sub == self.user_id).then_some(sub)
    }
}

/// Register and login share the same request body.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Register response - POST /register
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterResponse {
    pub id: i64,
    pub username: String,
}

impl RegisterResponse {
    pub fn from_record(record: &IdentityRecord) -> Self {
        Self {
            id: record.id,
            username: record.username.clone(),
        }
    }
}

/// Login response - POST /login
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: usize, // seconds until expiration
}

/// Current identity - GET /me
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub id: i64,
    pub exp: usize,
}

/// Uniform error body for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
