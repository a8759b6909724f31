use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::{jwt::JwtKeys, repo_types::Role},
    error::AppError,
};

/// Identity attached to a request by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Credential part of `Authorization: <scheme> <credential>`, if any.
/// The scheme is not checked here; a non-JWT credential fails verification.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.split_whitespace().nth(1)
}

/// No credential: 401. Credential that fails verification: 403.
/// Otherwise the [`Identity`] is inserted into the request extensions.
pub async fn require_auth(
    State(keys): State<JwtKeys>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or(AppError::Authentication("Authentication required"))?;

    let claims = keys.verify(token).map_err(|e| {
        warn!(reason = %e, "rejected bearer token");
        AppError::InvalidToken
    })?;

    req.extensions_mut().insert(Identity {
        user_id: claims.sub,
        role: claims.role,
    });
    Ok(next.run(req).await)
}

/// Role guard for admin-only routes. Must be layered inside [`require_auth`].
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .copied()
        .ok_or(AppError::Misconfigured("role guard mounted without auth middleware"))?;

    if !identity.is_admin() {
        warn!(user_id = %identity.user_id, role = %identity.role, "admin route denied");
        return Err(AppError::Forbidden("Access denied: Admins only"));
    }
    Ok(next.run(req).await)
}

/// Handler-side access to the identity attached by [`require_auth`].
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .copied()
            .map(AuthUser)
            .ok_or(AppError::Misconfigured("handler requires auth middleware"))
    }
}
