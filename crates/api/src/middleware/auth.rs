//! Authentication middleware for protected routes.

use axum::{
    Json,
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::convert::Infallible;
use tracing::debug;

use crate::{AppState, ApiError};
use solaris_core::auth::Principal;
use solaris_shared::types::TenantId;
use solaris_shared::{AppError, Claims, JwtError};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
}

/// Authentication middleware that validates JWT tokens.
///
/// Rejects the request with 401 when the token is missing or invalid, and
/// otherwise stores the claims in request extensions.
pub async fn auth_middleware<S>(State(state): State<AppState<S>>, mut request: Request, next: Next) -> Response
where
    S: Clone + Send + Sync + 'static,
{
    let Some(token) = bearer_token(&request) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "missing_token",
                "message": "Authorization header with Bearer token is required"
            })),
        )
            .into_response();
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            let (error, message) = match e {
                JwtError::Expired => ("token_expired", "Token has expired"),
                _ => ("invalid_token", "Invalid or malformed token"),
            };
            (StatusCode::UNAUTHORIZED, Json(json!({ "error": error, "message": message }))).into_response()
        }
    }
}

/// Authentication middleware for the callable functions.
///
/// A missing or invalid token does not reject the request; the function
/// itself answers `permission-denied` when no caller is attached.
pub async fn optional_auth_middleware<S>(
    State(state): State<AppState<S>>,
    mut request: Request,
    next: Next,
) -> Response
where
    S: Clone + Send + Sync + 'static,
{
    let claims = bearer_token(&request).and_then(|token| match state.jwt_service.validate_token(token) {
        Ok(claims) => Some(claims),
        Err(e) => {
            debug!(error = %e, "Ignoring invalid token on callable function");
            None
        }
    });
    if let Some(claims) = claims {
        request.extensions_mut().insert(claims);
    }
    next.run(request).await
}

/// Extractor for authenticated caller claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the caller ID from the claims.
    #[must_use]
    pub fn user_id(&self) -> uuid::Uuid {
        self.0.user_id()
    }

    /// Returns the tenant ID from the claims.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        TenantId::from_uuid(self.0.tenant_id())
    }

    /// Returns the caller's role.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.0.role
    }

    /// Caller identity as seen by the ledger operations.
    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal::new(self.0.sub.to_string(), self.0.role.clone(), self.0.admin)
    }

    /// Requires the caller to belong to `tenant_id`. Backend callers may act
    /// on any tenant.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for a caller of another tenant.
    pub fn authorize(&self, tenant_id: TenantId) -> Result<(), ApiError> {
        if self.tenant_id() == tenant_id || self.principal().is_backend() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied("Usuário sem acesso a esta empresa.".to_string()).into())
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": "unauthorized",
                        "message": "Authentication required"
                    })),
                )
            })
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Claims>().cloned().map(AuthUser))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn user(role: &str, admin: bool) -> AuthUser {
        let claims = Claims::new(Uuid::new_v4(), Uuid::new_v4(), role, Utc::now() + Duration::minutes(5));
        AuthUser(claims.with_admin(admin))
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_principal_carries_role_and_admin() {
        assert!(user("system", false).principal().is_backend());
        assert!(user("operador", true).principal().is_backend());
        assert!(!user("operador", false).principal().is_backend());
    }

    #[test]
    fn test_authorize_tenant() {
        let caller = user("operador", false);
        assert!(caller.authorize(caller.tenant_id()).is_ok());
        assert!(matches!(
            caller.authorize(TenantId::new()),
            Err(ApiError::App(AppError::PermissionDenied(_)))
        ));
        assert!(user("system", false).authorize(TenantId::new()).is_ok());
    }
}
