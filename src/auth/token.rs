// JWT token verification for the coach/admin role gate
//
// Token issuing (login, refresh, passwords) lives in the identity service;
// this side only needs to verify bearer tokens and read the actor out of
// them. Generation is kept for tests and operational tooling.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::error::AuthError;
use crate::auth::models::Role;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32, // coach_id
    pub role: Role,
    pub exp: i64, // expiration timestamp
    pub iat: i64, // issued at timestamp
}

/// Token service for JWT operations
pub struct TokenService {
    secret: String,
    token_duration: i64, // in seconds
}

impl TokenService {
    /// Create a new TokenService with secret key
    /// Tokens expire in 15 minutes (900 seconds)
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            token_duration: 900,
        }
    }

    /// Generate a token for a coach or admin actor
    pub fn generate_token(&self, coach_id: i32, role: Role) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let exp = now + self.token_duration;

        let claims = Claims {
            sub: coach_id,
            role,
            iat: now,
            exp,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
    }

    /// Validate a token and return its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::default();

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            if e.to_string().contains("ExpiredSignature") {
                AuthError::ExpiredToken
            } else {
                AuthError::InvalidToken
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> TokenService {
        TokenService::new("test-secret-key".to_string())
    }

    #[test]
    fn test_generate_and_validate_token() {
        let service = test_service();
        let token = service.generate_token(42, Role::Coach).unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, Role::Coach);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_admin_role_survives_roundtrip() {
        let service = test_service();
        let token = service.generate_token(1, Role::Admin).unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service = test_service();
        let token = service.generate_token(42, Role::Coach).unwrap();

        let other = TokenService::new("another-secret".to_string());
        assert!(matches!(
            other.validate_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = test_service();
        assert!(matches!(
            service.validate_token("not.a.token"),
            Err(AuthError::InvalidToken)
        ));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// Any coach id and role survive the encode/decode roundtrip
    #[test]
    fn prop_claims_roundtrip() {
        proptest!(|(
            coach_id in 1i32..=1_000_000,
            is_admin in any::<bool>()
        )| {
            let role = if is_admin { Role::Admin } else { Role::Coach };
            let service = TokenService::new("prop-secret".to_string());
            let token = service.generate_token(coach_id, role).unwrap();
            let claims = service.validate_token(&token).unwrap();

            prop_assert_eq!(claims.sub, coach_id);
            prop_assert_eq!(claims.role, role);
        });
    }
}
