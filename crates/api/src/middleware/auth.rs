//! JWT authentication middleware and helpers.
//!
//! Provides JWT encoding/decoding plus an `AuthUser` Axum extractor that
//! turns the bearer token into the feed caller: user id, role and the HR
//! backend token fetches are made with.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use hrdesk_common::error::AppError;
use hrdesk_common::types::{Caller, Identity, Role};

use crate::state::AppState;

/// JWT claims stored in the token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject, the HR system's user id
    pub sub: String,
    /// Dashboard role; decides which feed sources are polled
    pub role: Role,
    /// The user's own HR backend token, forwarded on every collaborator call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hr_token: Option<String>,
    /// Expiration time (UNIX timestamp)
    pub exp: i64,
    /// Issued at (UNIX timestamp)
    pub iat: i64,
}

/// Authenticated user extracted from JWT token.
///
/// Use as an Axum extractor on protected routes:
/// ```ignore
/// async fn handler(auth: AuthUser) -> impl IntoResponse {
///     // auth.caller is the user id, role and HR backend token
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub caller: Caller,
    pub claims: Claims,
}

/// Encode a JWT token for a user.
pub fn encode_jwt(
    user_id: &str,
    role: Role,
    hr_token: Option<&str>,
    secret: &str,
    expiry_hours: u64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiry_hours as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        hr_token: hr_token.map(String::from),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Auth(format!("Failed to encode JWT: {}", e)))?;

    Ok(token)
}

/// Decode and validate a JWT token.
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims)
}

/// Axum `FromRequestParts` implementation for `AuthUser`.
///
/// Extracts and validates the JWT from the `Authorization: Bearer <token>` header.
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let secret = state.config.jwt_secret.clone();

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        async move {
            if secret.is_empty() {
                return Err(AppError::Config("JWT_SECRET is not configured".to_string()));
            }

            let Some(token) = auth_header.as_deref().and_then(|h| h.strip_prefix("Bearer "))
            else {
                return Err(AppError::Auth(
                    "Missing or invalid Authorization header. Use 'Bearer <JWT>'".to_string(),
                ));
            };

            let claims = decode_jwt(token, &secret)?;
            let identity = Identity::from_parts(Some(&claims.sub), Some(claims.role))
                .ok_or_else(|| AppError::Auth("Token has an empty subject".to_string()))?;
            let caller = Caller::new(identity).with_credential(claims.hr_token.as_deref());

            Ok(AuthUser { caller, claims })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-for-unit-tests";

    #[test]
    fn test_encode_decode_jwt() {
        let token = encode_jwt("emp-17", Role::Hr, Some("hr-abc"), TEST_SECRET, 24).unwrap();
        let claims = decode_jwt(&token, TEST_SECRET).unwrap();
        assert_eq!(claims.sub, "emp-17");
        assert_eq!(claims.role, Role::Hr);
        assert_eq!(claims.hr_token.as_deref(), Some("hr-abc"));
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_hr_token_claim_is_optional() {
        let token = encode_jwt("emp-17", Role::Employee, None, TEST_SECRET, 24).unwrap();
        let claims = decode_jwt(&token, TEST_SECRET).unwrap();
        assert_eq!(claims.hr_token, None);
    }

    #[test]
    fn test_invalid_secret_rejected() {
        let token = encode_jwt("emp-17", Role::Employee, None, TEST_SECRET, 24).unwrap();
        let result = decode_jwt(&token, "wrong-secret");
        assert!(result.is_err());
    }

    #[test]
    fn test_expired_jwt_rejected() {
        // Create a token that expired 1 hour ago
        let now = Utc::now();
        let claims = Claims {
            sub: "emp-17".to_string(),
            role: Role::Employee,
            hr_token: None,
            exp: (now - Duration::hours(1)).timestamp(),
            iat: (now - Duration::hours(2)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        let result = decode_jwt(&token, TEST_SECRET);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let now = Utc::now();
        let claims = serde_json::json!({
            "sub": "emp-17",
            "role": "superuser",
            "exp": (now + Duration::hours(1)).timestamp(),
            "iat": now.timestamp(),
        });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        assert!(decode_jwt(&token, TEST_SECRET).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let result = decode_jwt("not.a.valid.jwt", TEST_SECRET);
        assert!(result.is_err());
    }
}
