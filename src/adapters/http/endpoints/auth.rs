//! Registration, login, token refresh and the session check.

use crate::adapters::http::error::ApiError;
use crate::adapters::http::extract::JsonBody;
use crate::adapters::http::middleware::auth::bearer_token;
use crate::adapters::http::types::AppContext;
use crate::shared::token::{TokenKind, TokenPair};
use crate::usecases::auth_service::{LoginRequest, LoginResponse, RegisterRequest};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user_id: String,
}

#[derive(Serialize)]
pub struct CheckAuthResponse {
    pub authenticated: bool,
}

/// `POST /api/auth/register`
pub async fn register(
    State(ctx): State<AppContext>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let user_id = ctx.auth.register(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user_id,
        }),
    ))
}

/// `POST /api/auth/login`
pub async fn login(
    State(ctx): State<AppContext>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    Ok(Json(ctx.auth.login(req).await?))
}

/// `POST /api/auth/refresh`: bearer refresh token in, fresh pair out.
pub async fn refresh(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<TokenPair>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Refresh token is missing".into()))?;
    let user_id = ctx.auth.authenticate(token, TokenKind::Refresh)?;
    Ok(Json(ctx.auth.refresh(&user_id).await?))
}

/// `GET /api/auth/check-auth`
pub async fn check_auth(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> (StatusCode, Json<CheckAuthResponse>) {
    let authenticated = bearer_token(&headers)
        .is_some_and(|t| ctx.auth.authenticate(t, TokenKind::Access).is_ok());
    let status = if authenticated {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    };
    (status, Json(CheckAuthResponse { authenticated }))
}
