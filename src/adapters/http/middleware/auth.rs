//! Bearer access-token check for protected routes.

use crate::adapters::http::error::ApiError;
use crate::adapters::http::types::{AppContext, AuthUser};
use crate::shared::token::TokenKind;
use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Token from an `Authorization: Bearer <token>` header, if present and non-empty.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Validate the access token and inject [`AuthUser`]. Expects `AppContext`
/// in request extensions.
pub async fn require_auth(req: Request, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let ctx = req
        .extensions()
        .get::<AppContext>()
        .cloned()
        .ok_or_else(|| ApiError::Internal("missing app context".into()))?;

    let token = bearer_token(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("Authentication token is missing".into()))?;
    let user_id = ctx.auth.authenticate(token, TokenKind::Access)?;

    req.extensions_mut().insert(AuthUser { user_id });
    Ok(next.run(req).await)
}
