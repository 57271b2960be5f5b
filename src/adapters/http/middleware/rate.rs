//! Per-client rate limiting for the unauthenticated auth routes.

use crate::adapters::http::error::ApiError;
use crate::adapters::http::types::RouteLimit;
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;

/// Peer address, else "anonymous". The first `X-Forwarded-For` hop wins only
/// when `trust_forwarded` is set; clients can write that header themselves.
fn client_key(req: &Request, trust_forwarded: bool) -> String {
    if trust_forwarded {
        if let Some(forwarded) = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return forwarded.to_string();
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Returns 429 with `Retry-After` once the limiter rejects the client.
pub async fn limit(State(route): State<RouteLimit>, req: Request, next: Next) -> Response {
    let key = client_key(&req, route.trust_forwarded);

    // MutexGuard is !Send; drop it before awaiting.
    let verdict = {
        match route.limiter.lock() {
            Ok(mut guard) => guard
                .check(&key)
                .map_err(|retry_after| ApiError::RateLimited { retry_after }),
            Err(_) => Err(ApiError::Internal("rate limiter lock".into())),
        }
    };

    match verdict {
        Ok(()) => next.run(req).await,
        Err(err) => {
            tracing::warn!(client = %key, "rate limit exceeded");
            err.into_response()
        }
    }
}
