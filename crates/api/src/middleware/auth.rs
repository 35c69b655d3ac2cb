//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use lyc_core::error::CoreError;
use lyc_core::roles::{ROLE_ADMIN, ROLE_SERVICE};

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated principal extracted from a JWT Bearer token in the
/// `Authorization` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The principal's external user id (from `claims.sub`).
    pub user_id: String,
    /// The principal's role name.
    pub role: String,
}

impl AuthUser {
    /// Admins and the service principal may act on behalf of other users.
    pub fn is_operator(&self) -> bool {
        self.role == ROLE_ADMIN || self.role == ROLE_SERVICE
    }

    /// Resolve the user a request acts on.
    ///
    /// Operators may name any user (or none). Everyone else defaults to, and
    /// is restricted to, their own id.
    pub fn resolve_subject(&self, requested: Option<String>) -> Result<Option<String>, AppError> {
        if self.is_operator() {
            return Ok(requested);
        }
        match requested {
            Some(user_id) if user_id != self.user_id => Err(AppError::Core(CoreError::Forbidden(
                "Cannot act on behalf of another user".into(),
            ))),
            _ => Ok(Some(self.user_id.clone())),
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn user(role: &str) -> AuthUser {
        AuthUser {
            user_id: "user-1".to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn regular_user_defaults_to_self() {
        let subject = user("user").resolve_subject(None).unwrap();
        assert_eq!(subject.as_deref(), Some("user-1"));
    }

    #[test]
    fn regular_user_cannot_name_someone_else() {
        let result = user("user").resolve_subject(Some("user-2".into()));
        assert_matches!(result, Err(AppError::Core(CoreError::Forbidden(_))));
    }

    #[test]
    fn service_passes_subject_through() {
        assert_eq!(user(ROLE_SERVICE).resolve_subject(None).unwrap(), None);
        assert_eq!(
            user(ROLE_SERVICE).resolve_subject(Some("user-9".into())).unwrap().as_deref(),
            Some("user-9")
        );
    }
}
