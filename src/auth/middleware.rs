// Authentication extractor for protected routes

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::auth::{error::AuthError, models::Role, token::TokenService};

/// Authenticated actor extractor for protected routes
///
/// Yields the coach id and role carried by the bearer token. Role gating
/// beyond extraction happens at the operation boundary: services check
/// admin-only transitions and coach/roster ownership themselves.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedActor {
    pub coach_id: i32,
    pub role: Role,
}

impl AuthenticatedActor {
    /// Whether this actor may operate on the given coach's data
    pub fn can_manage(&self, coach_id: i32) -> bool {
        self.role == Role::Admin || self.coach_id == coach_id
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The coach an operation is performed for: admins may act on behalf of
    /// any coach, other actors always act as themselves.
    pub fn effective_coach_id(&self, requested: Option<i32>) -> i32 {
        match (self.role, requested) {
            (Role::Admin, Some(coach_id)) => coach_id,
            _ => self.coach_id,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedActor
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Extract Authorization header
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;

        // Verify Bearer token format
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| AuthError::TokenGenerationError("JWT_SECRET not configured".to_string()))?;

        let token_service = TokenService::new(jwt_secret);
        let claims = token_service.validate_token(token)?;

        Ok(AuthenticatedActor {
            coach_id: claims.sub,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coach_manages_only_own_roster() {
        let actor = AuthenticatedActor {
            coach_id: 7,
            role: Role::Coach,
        };

        assert!(actor.can_manage(7));
        assert!(!actor.can_manage(8));
        assert!(!actor.is_admin());
    }

    #[test]
    fn test_admin_manages_any_roster() {
        let actor = AuthenticatedActor {
            coach_id: 1,
            role: Role::Admin,
        };

        assert!(actor.can_manage(1));
        assert!(actor.can_manage(99));
        assert!(actor.is_admin());
    }

    #[test]
    fn test_effective_coach_id() {
        let coach = AuthenticatedActor {
            coach_id: 7,
            role: Role::Coach,
        };
        let admin = AuthenticatedActor {
            coach_id: 1,
            role: Role::Admin,
        };

        // A coach always acts as themselves, whatever they request
        assert_eq!(coach.effective_coach_id(Some(9)), 7);
        assert_eq!(coach.effective_coach_id(None), 7);

        // An admin may act on behalf of a requested coach
        assert_eq!(admin.effective_coach_id(Some(9)), 9);
        assert_eq!(admin.effective_coach_id(None), 1);
    }
}
