//! Route table and middleware stack.
//!
//! Layers, outermost first: Extension(ctx) → CORS → trace → per-route (rate limit | auth) → handler.
//! Middleware reads `AppContext` from extensions; handlers use `State`.

use crate::adapters::http::endpoints::{auth, chat, health, help, medicines, onboarding, user};
use crate::adapters::http::middleware;
use crate::adapters::http::types::AppContext;
use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Voice messages can exceed axum's 2 MB default.
pub const HELP_BODY_LIMIT: usize = 25 * 1024 * 1024;

pub fn build_router(ctx: AppContext) -> Router {
    let limits = ctx.limits.clone();

    // NOTE: Path params use `:param` syntax (axum 0.7).
    let public = Router::new()
        .route(
            "/auth/register",
            post(auth::register).layer(from_fn_with_state(
                limits.for_route(&limits.register),
                middleware::rate::limit,
            )),
        )
        .route(
            "/auth/login",
            post(auth::login).layer(from_fn_with_state(
                limits.for_route(&limits.login),
                middleware::rate::limit,
            )),
        )
        .route(
            "/auth/refresh",
            post(auth::refresh).layer(from_fn_with_state(
                limits.for_route(&limits.refresh),
                middleware::rate::limit,
            )),
        )
        .route("/auth/check-auth", get(auth::check_auth));

    let protected = Router::new()
        .route("/onboarding/status", get(onboarding::status))
        .route("/onboarding/profile/basic", post(onboarding::basic))
        .route("/onboarding/profile/health", post(onboarding::health))
        .route("/onboarding/medications", post(onboarding::medications))
        .route("/onboarding/complete", post(onboarding::complete))
        .route(
            "/user/profile",
            get(user::get_profile).put(user::update_profile),
        )
        .route("/user/medicines", get(medicines::list).post(medicines::add))
        .route("/user/medicines/today", get(medicines::today))
        .route("/user/medicines/schedule", get(medicines::schedule))
        .route("/user/medicines/progress", get(medicines::progress))
        .route("/user/medicines/reminders", get(medicines::reminders))
        .route(
            "/user/medicines/:id",
            put(medicines::update).delete(medicines::delete),
        )
        .route("/user/medicines/:id/status", post(medicines::set_status))
        .route("/chat", post(chat::ask))
        .route("/chat/history", get(chat::history))
        .route(
            "/help",
            post(help::send).layer(DefaultBodyLimit::max(HELP_BODY_LIMIT)),
        )
        .route("/help/requests", get(help::history))
        .route_layer(from_fn(middleware::auth::require_auth));

    Router::new()
        .route("/health", get(health::check))
        .nest("/api", public.merge(protected))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(Extension(ctx.clone()))
        .with_state(ctx)
}
