//! Portal session tokens (HS256 JWT)

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::models::Role;
use thiserror::Error;

const ISSUER: &str = "portal-server";

/// JWT claims for portal users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub email: String,
    /// Role at issue time; re-checked against the user row on every request
    pub role: String,
    /// Linked client account for `client` users
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i64>,
    pub iss: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: i64,
    /// Issued at (Unix timestamp seconds)
    pub iat: i64,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }

    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }
}

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),
}

/// Create a session token
pub fn create_token(
    user_id: i64,
    email: &str,
    role: Role,
    client_id: Option<i64>,
    secret: &str,
    expiry_hours: i64,
) -> Result<String, JwtError> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.as_str().to_string(),
        client_id,
        iss: ISSUER.to_string(),
        exp: (now + chrono::Duration::hours(expiry_hours)).timestamp(),
        iat: now.timestamp(),
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::GenerationFailed(e.to_string()))
}

/// Verify signature, issuer and expiry
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
        _ => JwtError::InvalidToken(e.to_string()),
    })
}

pub fn extract_from_header(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-at-least-thirty-two-bytes";

    #[test]
    fn test_token_roundtrip() {
        let token = create_token(42, "ana@example.com", Role::PartnerAdmin, None, SECRET, 1)
            .unwrap();
        let claims = validate_token(&token, SECRET).unwrap();
        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.email, "ana@example.com");
        assert_eq!(claims.role(), Some(Role::PartnerAdmin));
        assert_eq!(claims.client_id, None);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token(1, "a@b.c", Role::Client, Some(3), SECRET, 1).unwrap();
        assert!(matches!(
            validate_token(&token, "another-secret-of-sufficient-size"),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = create_token(1, "a@b.c", Role::Admin, None, SECRET, -2).unwrap();
        assert!(matches!(
            validate_token(&token, SECRET),
            Err(JwtError::ExpiredToken)
        ));
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(extract_from_header("Basic abc"), None);
    }
}
