pub mod policy;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT payload carrying the caller's identity. Validity is purely a function
/// of signature and expiry; there is no revocation list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: i32, email: String, role: String, expiry_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            email,
            role,
            exp: (now + Duration::hours(expiry_hours)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Malformed token")]
    Malformed,

    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    #[error("JWT secret not configured")]
    InvalidSecret,
}

/// Sign a token encoding the given claims with the shared process secret.
pub fn issue(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Verify signature and expiry, returning the decoded claims.
pub fn verify(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            _ => AuthError::Malformed,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn claims() -> Claims {
        Claims::new(7, "a@x.com".to_string(), "owner".to_string(), 24)
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let token = issue(&claims(), SECRET).unwrap();
        let decoded = verify(&token, SECRET).unwrap();
        assert_eq!(decoded.user_id, 7);
        assert_eq!(decoded.email, "a@x.com");
        assert_eq!(decoded.role, "owner");
    }

    #[test]
    fn test_expired_token_rejected() {
        // Negative expiry puts exp in the past; signature is still valid.
        let expired = Claims::new(7, "a@x.com".to_string(), "owner".to_string(), -1);
        let token = issue(&expired, SECRET).unwrap();
        match verify(&token, SECRET) {
            Err(AuthError::Expired) => {}
            other => panic!("expected Expired, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue(&claims(), SECRET).unwrap();
        match verify(&token, "other-secret") {
            Err(AuthError::InvalidSignature) => {}
            other => panic!("expected InvalidSignature, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        match verify("not-a-jwt", SECRET) {
            Err(AuthError::Malformed) => {}
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_secret_refused() {
        assert!(issue(&claims(), "").is_err());
        assert!(verify("whatever", "").is_err());
    }
}
