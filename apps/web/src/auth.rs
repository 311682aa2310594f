//! JWT session module.
//!
//! Handles session token generation and validation. A token is carried in
//! the `tally_session` cookie for browser pages, or as
//! `Authorization: Bearer <token>` for API clients.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tally_core::{AccessLevel, User};
use tracing::error;
use uuid::Uuid;

use crate::error::ApiError;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "tally_session";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Username at login time
    pub username: String,

    /// Role flags at login time. The middleware re-reads them from the
    /// users table on every request.
    pub is_staff: bool,
    pub is_admin: bool,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

impl Claims {
    pub fn access_level(&self) -> AccessLevel {
        AccessLevel::from_flags(self.is_staff, self.is_admin)
    }
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: String, lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            lifetime_secs,
        }
    }

    /// Session lifetime in seconds.
    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Generate a session token for a logged-in user.
    pub fn generate_session_token(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            is_staff: user.is_staff,
            is_admin: user.is_admin,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| {
            error!(error = %e, "Failed to generate session token");
            ApiError::internal()
        })
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::default();

        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| ApiError::unauthenticated("Invalid or expired session"))?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(is_staff: bool, is_admin: bool) -> User {
        User {
            id: "user-001".to_string(),
            username: "asha".to_string(),
            password_hash: String::new(),
            is_staff,
            is_admin,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_session_token_roundtrip() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);

        let token = manager.generate_session_token(&user(true, false)).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "user-001");
        assert_eq!(claims.username, "asha");
        assert_eq!(claims.access_level(), AccessLevel::Staff);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new("secret-a".to_string(), 3600);
        let verifier = JwtManager::new("secret-b".to_string(), 3600);

        let token = issuer.generate_session_token(&user(false, true)).unwrap();
        let err = verifier.validate_token(&token).unwrap_err();
        assert_eq!(err.code, "UNAUTHENTICATED");
    }

    #[test]
    fn test_expired_token_rejected() {
        // Past the default 60 s leeway.
        let manager = JwtManager::new("test-secret".to_string(), -120);

        let token = manager.generate_session_token(&user(false, false)).unwrap();
        assert!(manager.validate_token(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Basic xyz"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
