//! JWT Token Issuer
//! Mission: Turn a verified identity into a signed, time-limited token

use crate::auth::{errors::AuthError, models::Claims};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

pub const TOKEN_TTL_HOURS: i64 = 24;

/// Stateless HS256 issuer. Holds only the shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: Option<String>,
}

impl TokenIssuer {
    /// A `None` or blank secret is accepted here and reported per request
    /// as [`AuthError::Config`].
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    fn secret(&self) -> Result<&[u8], AuthError> {
        self.secret
            .as_deref()
            .map(str::as_bytes)
            .ok_or(AuthError::Config("JWT_SECRET"))
    }

    /// Seconds a freshly issued token stays valid.
    pub fn expires_in(&self) -> usize {
        (TOKEN_TTL_HOURS * 3600) as usize
    }

    /// Sign a token for `identity_id` valid for 24 hours from now.
    pub fn issue(&self, identity_id: i64) -> Result<String, AuthError> {
        self.issue_at(identity_id, Utc::now())
    }

    /// Pure in (identity_id, now, secret).
    pub fn issue_at(&self, identity_id: i64, now: DateTime<Utc>) -> Result<String, AuthError> {
        let secret = self.secret()?;

        let expiration = now
            .checked_add_signed(Duration::hours(TOKEN_TTL_HOURS))
            .ok_or_else(|| AuthError::Signing("expiry overflows timestamp range".to_string()))?;

        let iat = usize::try_from(now.timestamp())
            .map_err(|_| AuthError::Signing("issue time precedes the epoch".to_string()))?;
        let exp = usize::try_from(expiration.timestamp())
            .map_err(|_| AuthError::Signing("expiry precedes the epoch".to_string()))?;

        let claims = Claims {
            sub: identity_id.to_string(),
            user_id: identity_id,
            iat,
            exp,
        };

        debug!(
            identity_id,
            ttl_hours = TOKEN_TTL_HOURS,
            "Generating JWT"
        );

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Check signature and expiry, returning the claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let secret = self.secret()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let decoded = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
            .map_err(|_| AuthError::Unauthorized)?;

        if decoded.claims.identity_id().is_none() {
            return Err(AuthError::Unauthorized);
        }

        debug!(identity_id = decoded.claims.user_id, "Validated JWT");
        Ok(decoded.claims)
    }
}
