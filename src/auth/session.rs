//! Session token verification.
//!
//! Sessions are HS256 JWTs signed with a secret shared with the identity
//! provider. A token is accepted from the `Authorization: Bearer` header or
//! from the session cookie, in that order.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{DriveboxError, Result};

/// Cookie name used when none is configured.
pub const DEFAULT_SESSION_COOKIE: &str = "drivebox_session";

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (identity ID).
    pub sub: String,
    /// Email address of the identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name of the identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Issued at timestamp.
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
}

/// A verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable identity ID; owns file records.
    pub id: String,
    /// Email address, if the provider supplied one.
    pub email: Option<String>,
    /// Display name, if the provider supplied one.
    pub name: Option<String>,
}

impl From<SessionClaims> for Identity {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
        }
    }
}

/// Validates session tokens and produces identities.
#[derive(Clone)]
pub struct SessionVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    cookie_name: String,
}

impl SessionVerifier {
    /// Create a verifier from the shared secret and the session cookie name.
    pub fn new(secret: &str, cookie_name: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let cookie_name = if cookie_name.is_empty() {
            DEFAULT_SESSION_COOKIE
        } else {
            cookie_name
        };

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            cookie_name: cookie_name.to_string(),
        }
    }

    /// Decode and validate a raw token.
    pub fn verify_token(&self, token: &str) -> Result<Identity> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!("Session token rejected: {}", e);
                DriveboxError::Unauthorized("invalid or expired session".to_string())
            })?;

        if data.claims.sub.trim().is_empty() {
            return Err(DriveboxError::Unauthorized(
                "session has no subject".to_string(),
            ));
        }

        Ok(data.claims.into())
    }

    /// Locate the session token in request headers.
    pub fn extract_token(&self, headers: &HeaderMap) -> Option<String> {
        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        bearer.or_else(|| {
            CookieJar::from_headers(headers)
                .get(&self.cookie_name)
                .map(|cookie| cookie.value().to_string())
                .filter(|token| !token.is_empty())
        })
    }

    /// Verify the session attached to a request.
    pub fn verify(&self, headers: &HeaderMap) -> Result<Identity> {
        let token = self
            .extract_token(headers)
            .ok_or_else(|| DriveboxError::Unauthorized("missing session".to_string()))?;
        self.verify_token(&token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn claims(sub: &str, exp_offset: i64) -> SessionClaims {
        let now = chrono::Utc::now().timestamp();
        SessionClaims {
            sub: sub.to_string(),
            email: Some(format!("{sub}@example.com")),
            name: None,
            iat: now as u64,
            exp: (now + exp_offset) as u64,
        }
    }

    fn token(secret: &str, claims: &SessionClaims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_valid_token() {
        let verifier = SessionVerifier::new(SECRET, "sid");
        let identity = verifier
            .verify_token(&token(SECRET, &claims("alice", 3600)))
            .unwrap();

        assert_eq!(identity.id, "alice");
        assert_eq!(identity.email.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn test_expired_token() {
        let verifier = SessionVerifier::new(SECRET, "sid");
        let result = verifier.verify_token(&token(SECRET, &claims("alice", -3600)));
        assert!(matches!(result, Err(DriveboxError::Unauthorized(_))));
    }

    #[test]
    fn test_wrong_secret() {
        let verifier = SessionVerifier::new("other-secret", "sid");
        let result = verifier.verify_token(&token(SECRET, &claims("alice", 3600)));
        assert!(matches!(result, Err(DriveboxError::Unauthorized(_))));
    }

    #[test]
    fn test_empty_subject_rejected() {
        let verifier = SessionVerifier::new(SECRET, "sid");
        let result = verifier.verify_token(&token(SECRET, &claims("  ", 3600)));
        assert!(matches!(result, Err(DriveboxError::Unauthorized(_))));
    }

    #[test]
    fn test_extract_bearer_token() {
        let verifier = SessionVerifier::new(SECRET, "sid");
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));

        assert_eq!(verifier.extract_token(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_extract_cookie_token() {
        let verifier = SessionVerifier::new(SECRET, "sid");
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; sid=xyz"));

        assert_eq!(verifier.extract_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_bearer_takes_precedence_over_cookie() {
        let verifier = SessionVerifier::new(SECRET, "sid");
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(COOKIE, HeaderValue::from_static("sid=from-cookie"));

        assert_eq!(
            verifier.extract_token(&headers).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn test_default_cookie_name() {
        let verifier = SessionVerifier::new(SECRET, "");
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("drivebox_session=abc; sid=other"),
        );

        assert_eq!(verifier.extract_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn test_verify_without_session() {
        let verifier = SessionVerifier::new(SECRET, "");

        let result = verifier.verify(&HeaderMap::new());
        assert!(matches!(result, Err(DriveboxError::Unauthorized(_))));
    }
}
