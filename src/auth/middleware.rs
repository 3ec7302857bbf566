use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::AdminContext;
use crate::app::AppState;
use crate::error::ErrorResponse;

/// Extractor that requires a valid admin session.
///
/// The token must verify and the admin account must still be active, so a
/// deactivated admin loses access before their token expires.
///
/// ```ignore
/// async fn protected_route(admin: RequireAdmin) -> impl IntoResponse {
///     format!("Hello, {}", admin.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AdminContext);

impl std::ops::Deref for RequireAdmin {
    type Target = AdminContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidFormat,
    InvalidToken,
    Inactive,
    Unavailable,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Missing authorization token",
            ),
            AuthError::InvalidFormat => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Invalid authorization format",
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Invalid or expired token",
            ),
            AuthError::Inactive => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Admin account is disabled",
            ),
            AuthError::Unavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred",
            ),
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

/// Pull the bearer token out of the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidFormat)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }

    Ok(token)
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;

        let claims = state.sessions.verify(token).map_err(|e| {
            tracing::warn!(error = %e, "Session token verification failed");
            AuthError::InvalidToken
        })?;

        let context = AdminContext::from_claims(&claims).map_err(|e| {
            tracing::warn!(error = %e, "Failed to build admin context");
            AuthError::InvalidToken
        })?;

        let is_active: Option<bool> =
            sqlx::query_scalar("SELECT is_active FROM admin_users WHERE id = $1")
                .bind(context.admin_id)
                .fetch_optional(&state.db)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to look up admin account");
                    AuthError::Unavailable
                })?;

        match is_active {
            Some(true) => Ok(RequireAdmin(context)),
            Some(false) => {
                tracing::warn!(admin_id = %context.admin_id, "Disabled admin attempted access");
                Err(AuthError::Inactive)
            }
            None => Err(AuthError::InvalidToken),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), Err(AuthError::MissingToken));
        assert_eq!(bearer_token(&headers("Basic abc")), Err(AuthError::InvalidFormat));
        assert_eq!(bearer_token(&headers("Bearer   ")), Err(AuthError::MissingToken));
    }
}
