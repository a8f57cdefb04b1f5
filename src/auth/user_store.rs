//! User Storage
//! Mission: Turn plaintext credentials into durable, verifiable identity records

use crate::auth::{
    errors::AuthError,
    models::IdentityRecord,
    password::{self, DEFAULT_COST},
};
use crate::db::UserRepository;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 6;
/// bcrypt only reads the first 72 bytes of its input.
pub const PASSWORD_MAX_LEN: usize = 72;

/// Plaintext behind the decoy hash checked for unknown usernames.
const DECOY_PASSWORD: &str = "decoy-password-for-unknown-users";

/// Input checks for login: both fields present, username in range.
/// Lengths are byte lengths.
pub fn validate_login_input(username: &str, password: &str) -> Result<(), AuthError> {
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::Validation(
            "Username and password are required".to_string(),
        ));
    }
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username.len()) {
        return Err(AuthError::Validation(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }
    Ok(())
}

/// Registration checks: the login checks plus the password length policy.
/// A too-short password at login is simply a wrong password.
pub fn validate_credentials(username: &str, password: &str) -> Result<(), AuthError> {
    validate_login_input(username, password)?;
    if password.len() < PASSWORD_MIN_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_LEN
        )));
    }
    if password.len() > PASSWORD_MAX_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at most {} bytes",
            PASSWORD_MAX_LEN
        )));
    }
    Ok(())
}

/// Credential store over an injected repository.
#[derive(Clone)]
pub struct UserStore {
    repo: Arc<dyn UserRepository>,
    hash_cost: u32,
    decoy_hash: Arc<OnceCell<String>>,
}

impl UserStore {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self::with_hash_cost(repo, DEFAULT_COST)
    }

    /// Test suites use bcrypt's minimum cost; production wiring goes
    /// through [`UserStore::new`].
    pub fn with_hash_cost(repo: Arc<dyn UserRepository>, hash_cost: u32) -> Self {
        Self {
            repo,
            hash_cost,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn repository(&self) -> &Arc<dyn UserRepository> {
        &self.repo
    }

    /// Validate, check uniqueness, hash and persist a new identity.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IdentityRecord, AuthError> {
        validate_credentials(username, password)?;

        // Fast path only; the UNIQUE constraint decides races.
        match self.repo.find_by_username(username).await {
            Ok(_) => return Err(AuthError::Conflict),
            Err(crate::db::StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let password_hash = password::hash_password(password, self.hash_cost).await?;
        let record = self.repo.insert(username, &password_hash).await?;

        info!(username = %record.username, id = record.id, "Created user");
        Ok(record)
    }

    /// Exact-match fetch. A miss is [`AuthError::NotFound`].
    pub async fn lookup(&self, username: &str) -> Result<IdentityRecord, AuthError> {
        let record = self.repo.find_by_username(username).await?;
        debug!(username, id = record.id, "User found");
        Ok(record)
    }

    /// Timing-safe check through bcrypt's own verify routine.
    pub async fn verify(&self, plaintext_password: &str, stored_hash: &str) -> bool {
        password::verify_password(plaintext_password, stored_hash).await
    }

    /// Burn one verify at the store's cost for a username that does not
    /// exist, so the miss takes as long as a wrong password. Always false.
    pub async fn verify_unknown(&self, plaintext_password: &str) -> bool {
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| password::hash_password(DECOY_PASSWORD, self.hash_cost))
            .await;
        match decoy {
            Ok(hash) => {
                self.verify(plaintext_password, hash).await;
            }
            Err(e) => warn!(error = %e, "Decoy hash unavailable"),
        }
        false
    }

    #[cfg(test)]
    pub(crate) fn decoy_hash_ready(&self) -> bool {
        self.decoy_hash.initialized()
    }
}
