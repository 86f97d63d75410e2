//! Staff JWT authentication for the product table dashboard.
//!
//! Every dashboard route takes a [`RequireStaff`] argument, so requests are
//! rejected before any grid is built:
//!
//! ```rust,ignore
//! async fn handler(staff: RequireStaff) -> impl IntoResponse {
//!     format!("Hello, {}!", staff.username())
//! }
//! ```
//!
//! # Token Requirements
//!
//! The JWT must:
//! - Be signed (HS256) with the server's `JWT_SECRET`
//! - Have a valid `exp` (expiration) claim
//! - Have an `iss` claim equal to [`ISSUER`]
//! - Carry `is_superuser: true`; other staff get 403

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::Config;

pub const ISSUER: &str = "product-tables";

/// Lifetime of tokens issued by [`issue_staff_token`], in seconds.
pub const TOKEN_TTL_SECS: i64 = 8 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffClaims {
    pub sub: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Signs a dashboard token for `username`.
pub fn issue_staff_token(
    username: &str,
    is_superuser: bool,
    jwt_secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = StaffClaims {
        sub: username.to_string(),
        is_staff: true,
        is_superuser,
        iat: now,
        exp: now + TOKEN_TTL_SECS,
        iss: ISSUER.to_string(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
}

/// A superuser, authenticated from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct RequireStaff {
    claims: StaffClaims,
}

impl RequireStaff {
    pub fn username(&self) -> &str {
        &self.claims.sub
    }

    pub fn claims(&self) -> &StaffClaims {
        &self.claims
    }
}

/// Rejection for [`RequireStaff`].
#[derive(Debug, Serialize)]
pub struct StaffAuthError {
    #[serde(skip)]
    status: StatusCode,
    pub error: String,
    pub message: String,
}

impl StaffAuthError {
    fn unauthorized(error: &str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: error.to_string(),
            message: message.into(),
        }
    }

    fn missing_token() -> Self {
        Self::unauthorized(
            "missing_token",
            "Authorization header with Bearer token is required",
        )
    }

    fn invalid_format() -> Self {
        Self::unauthorized(
            "invalid_format",
            "Authorization header must be in format: Bearer <token>",
        )
    }

    fn invalid_token(reason: impl Into<String>) -> Self {
        Self::unauthorized("invalid_token", reason)
    }

    fn missing_config() -> Self {
        Self::unauthorized("server_error", "Server configuration error")
    }

    fn access_denied() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            error: "access_denied".to_string(),
            message: "Superuser access is required".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for StaffAuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

fn extract_bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    let header_str = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header_str.strip_prefix("Bearer ")?;
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn validate_staff_token(token: &str, jwt_secret: &str) -> Result<StaffClaims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;

    decode::<StaffClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => "Token has expired".to_string(),
        jsonwebtoken::errors::ErrorKind::InvalidSignature => "Invalid token signature".to_string(),
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => "Invalid token issuer".to_string(),
        _ => format!("Token validation failed: {e}"),
    })
}

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = StaffAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let config = parts
            .extensions
            .get::<Config>()
            .ok_or_else(StaffAuthError::missing_config)?;

        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            if parts.headers.contains_key(AUTHORIZATION) {
                StaffAuthError::invalid_format()
            } else {
                StaffAuthError::missing_token()
            }
        })?;

        let claims = validate_staff_token(token, config.jwt_secret())
            .map_err(StaffAuthError::invalid_token)?;

        if !claims.is_superuser {
            tracing::warn!(username = %claims.sub, "Dashboard access denied");
            return Err(StaffAuthError::access_denied());
        }

        Ok(RequireStaff { claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    const TEST_SECRET: &str = "test-jwt-secret-for-unit-tests";

    #[test]
    fn test_extract_bearer_token_valid() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer my-token-123".parse().unwrap());

        assert_eq!(extract_bearer_token(&headers), Some("my-token-123"));
    }

    #[test]
    fn test_extract_bearer_token_missing_or_malformed() {
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "my-token-123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn test_validate_staff_token_success() {
        let token = issue_staff_token("admin", true, TEST_SECRET).unwrap();
        let claims = validate_staff_token(&token, TEST_SECRET).unwrap();

        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.iss, ISSUER);
        assert!(claims.is_superuser);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);
    }

    #[test]
    fn test_validate_staff_token_wrong_secret() {
        let token = issue_staff_token("admin", true, TEST_SECRET).unwrap();
        let result = validate_staff_token(&token, "wrong-secret");

        assert!(result.unwrap_err().contains("Invalid token signature"));
    }

    #[test]
    fn test_validate_staff_token_wrong_issuer() {
        let now = chrono::Utc::now().timestamp();
        let claims = StaffClaims {
            sub: "admin".to_string(),
            is_staff: true,
            is_superuser: true,
            iat: now,
            exp: now + 60,
            iss: "someone-else".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        let result = validate_staff_token(&token, TEST_SECRET);
        assert_eq!(result.unwrap_err(), "Invalid token issuer");
    }

    #[test]
    fn test_validate_staff_token_expired() {
        let now = chrono::Utc::now().timestamp();
        let claims = StaffClaims {
            sub: "admin".to_string(),
            is_staff: true,
            is_superuser: true,
            iat: now - 7200,
            exp: now - 3600,
            iss: ISSUER.to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        let result = validate_staff_token(&token, TEST_SECRET);
        assert_eq!(result.unwrap_err(), "Token has expired");
    }

    #[test]
    fn test_validate_staff_token_malformed() {
        assert!(validate_staff_token("not-a-valid-jwt", TEST_SECRET).is_err());
    }

    #[test]
    fn test_staff_auth_error_types() {
        let missing = StaffAuthError::missing_token();
        assert_eq!(missing.error, "missing_token");
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let invalid_format = StaffAuthError::invalid_format();
        assert_eq!(invalid_format.error, "invalid_format");

        let invalid_token = StaffAuthError::invalid_token("test reason");
        assert_eq!(invalid_token.error, "invalid_token");
        assert_eq!(invalid_token.message, "test reason");

        let missing_config = StaffAuthError::missing_config();
        assert_eq!(missing_config.error, "server_error");

        let denied = StaffAuthError::access_denied();
        assert_eq!(denied.error, "access_denied");
        assert_eq!(denied.into_response().status(), StatusCode::FORBIDDEN);
    }
}
