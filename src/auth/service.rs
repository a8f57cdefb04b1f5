//! Core business logic for the authentication system.
//!
//! Orchestrates the credential store and the token issuer. Login walks a
//! fixed sequence of stages and stops at the first one that fails; the stage
//! is logged with the username so operators can tell where a rejection came
//! from without the client being able to.

use crate::auth::{
    errors::AuthError,
    jwt::TokenIssuer,
    models::IdentityRecord,
    user_store::{validate_login_input, UserStore},
};
use std::fmt;
use tracing::{info, warn};

/// Progress of one login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    Received,
    Validated,
    LookedUp,
    PasswordVerified,
    TokenIssued,
}

impl LoginStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginStage::Received => "received",
            LoginStage::Validated => "validated",
            LoginStage::LookedUp => "looked_up",
            LoginStage::PasswordVerified => "password_verified",
            LoginStage::TokenIssued => "token_issued",
        }
    }
}

impl fmt::Display for LoginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of a login attempt: the last stage reached and why the
/// next one was refused.
#[derive(Debug)]
pub struct LoginRejected {
    pub reached: LoginStage,
    pub error: AuthError,
}

/// Successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_in: usize,
    pub user_id: i64,
}

#[derive(Clone)]
pub struct AuthService {
    users: UserStore,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(users: UserStore, tokens: TokenIssuer) -> Self {
        Self { users, tokens }
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IdentityRecord, AuthError> {
        self.users.register(username, password).await.map_err(|e| {
            warn!(username, stage = "register", error = %e, "Registration rejected");
            e
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        self.login_staged(username, password).await.map_err(|rejected| {
            warn!(
                username,
                stage = %rejected.reached,
                error = %rejected.error,
                "Login rejected"
            );
            rejected.error
        })
    }

    /// Same as [`AuthService::login`] but keeps the stage at which the
    /// attempt stopped.
    pub async fn login_staged(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, LoginRejected> {
        let mut stage = LoginStage::Received;
        let reject = |reached: LoginStage, error: AuthError| LoginRejected { reached, error };

        validate_login_input(username, password).map_err(|e| reject(stage, e))?;
        stage = LoginStage::Validated;

        let user = match self.users.lookup(username).await {
            Ok(user) => user,
            // Unknown user and wrong password must look the same from outside,
            // in latency as well as in the response.
            Err(AuthError::NotFound) => {
                self.users.verify_unknown(password).await;
                return Err(reject(stage, AuthError::InvalidCredentials));
            }
            Err(e) => return Err(reject(stage, e)),
        };
        stage = LoginStage::LookedUp;

        if !self.users.verify(password, &user.password_hash).await {
            return Err(reject(stage, AuthError::InvalidCredentials));
        }
        stage = LoginStage::PasswordVerified;

        let token = self.tokens.issue(user.id).map_err(|e| reject(stage, e))?;
        stage = LoginStage::TokenIssued;

        info!(username = %user.username, id = user.id, stage = %stage, "Login successful");

        Ok(LoginOutcome {
            token,
            expires_in: self.tokens.expires_in(),
            user_id: user.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryUserRepository;
    use std::sync::Arc;

    fn create_test_service(secret: Option<&str>) -> AuthService {
        let users = UserStore::with_hash_cost(Arc::new(InMemoryUserRepository::new()), 4);
        AuthService::new(users, TokenIssuer::new(secret.map(str::to_string)))
    }

    #[tokio::test]
    async fn test_login_issues_token_for_registered_identity() {
        let service = create_test_service(Some("test-secret"));
        let user = service.register("alice", "secret1").await.unwrap();

        let outcome = service.login("alice", "secret1").await.unwrap();
        assert_eq!(outcome.user_id, user.id);
        assert_eq!(outcome.expires_in, 24 * 3600);

        let claims = service.tokens().validate_token(&outcome.token).unwrap();
        assert_eq!(claims.identity_id(), Some(user.id));
    }

    #[tokio::test]
    async fn test_stage_reached_on_each_rejection() {
        let service = create_test_service(Some("test-secret"));
        service.register("alice", "secret1").await.unwrap();

        let bad_input = service.login_staged("al", "secret1").await.unwrap_err();
        assert_eq!(bad_input.reached, LoginStage::Received);
        assert!(matches!(bad_input.error, AuthError::Validation(_)));

        let unknown = service.login_staged("bob", "secret1").await.unwrap_err();
        assert_eq!(unknown.reached, LoginStage::Validated);
        assert!(matches!(unknown.error, AuthError::InvalidCredentials));

        let wrong = service.login_staged("alice", "wrong-pw").await.unwrap_err();
        assert_eq!(wrong.reached, LoginStage::LookedUp);
        assert!(matches!(wrong.error, AuthError::InvalidCredentials));

        // Shorter than the registration minimum is still just a wrong password.
        let short = service.login_staged("alice", "wrong").await.unwrap_err();
        assert_eq!(short.reached, LoginStage::LookedUp);
        assert!(matches!(short.error, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_unknown_user_still_pays_for_a_verify() {
        let service = create_test_service(Some("test-secret"));
        assert!(!service.users().decoy_hash_ready());

        let unknown = service.login_staged("mallory", "secret1").await.unwrap_err();
        assert_eq!(unknown.reached, LoginStage::Validated);
        assert!(matches!(unknown.error, AuthError::InvalidCredentials));
        assert!(service.users().decoy_hash_ready());
    }

    #[tokio::test]
    async fn test_unknown_user_latency_tracks_wrong_password() {
        // Cost 8 is slow enough that skipping bcrypt would be obvious.
        let users = UserStore::with_hash_cost(Arc::new(InMemoryUserRepository::new()), 8);
        let service = AuthService::new(users, TokenIssuer::new(Some("test-secret".to_string())));
        service.register("alice", "secret1").await.unwrap();
        // Warm the decoy so the measured miss is a single verify.
        service.login("ghost", "secret1").await.unwrap_err();

        let start = std::time::Instant::now();
        service.login("alice", "wrong-pw").await.unwrap_err();
        let known = start.elapsed();

        let start = std::time::Instant::now();
        service.login("mallory", "wrong-pw").await.unwrap_err();
        let unknown = start.elapsed();

        assert!(
            unknown * 4 >= known,
            "unknown user {:?} vs known user {:?}",
            unknown,
            known
        );
    }

    #[tokio::test]
    async fn test_missing_secret_fails_after_password_check() {
        let service = create_test_service(None);
        service.register("alice", "secret1").await.unwrap();

        let rejected = service.login_staged("alice", "secret1").await.unwrap_err();
        assert_eq!(rejected.reached, LoginStage::PasswordVerified);
        assert!(matches!(rejected.error, AuthError::Config(_)));

        // A wrong password is still a 401, not a config fault.
        let wrong = service.login("alice", "wrong-pw").await.unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_registration_does_not_need_secret() {
        let service = create_test_service(None);
        assert!(service.register("alice", "secret1").await.is_ok());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(LoginStage::LookedUp.to_string(), "looked_up");
        assert_eq!(LoginStage::TokenIssued.as_str(), "token_issued");
    }
}
