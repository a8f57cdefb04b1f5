//! Password hashing with bcrypt.

use crate::auth::errors::AuthError;
use tracing::warn;

pub use bcrypt::DEFAULT_COST;

/// Derive a salted bcrypt hash. Runs on the blocking pool: at the default
/// cost a single hash takes long enough to stall an async worker.
pub async fn hash_password(plain: &str, cost: u32) -> Result<String, AuthError> {
    let plain = plain.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check `plain` against a stored hash using bcrypt's own verification.
/// A malformed hash never matches.
pub async fn verify_password(plain: &str, stored_hash: &str) -> bool {
    let plain = plain.to_string();
    let stored_hash = stored_hash.to_string();
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &stored_hash)).await;

    match outcome {
        Ok(Ok(valid)) => valid,
        Ok(Err(e)) => {
            warn!(error = %e, "Stored password hash could not be verified");
            false
        }
        Err(e) => {
            warn!(error = %e, "Password verification task aborted");
            false
        }
    }
}
