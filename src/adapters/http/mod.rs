//! HTTP API (axum). JSON in and out; bearer tokens for everything but auth.

pub mod endpoints;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use router::build_router;
pub use types::{AppContext, AuthUser, RateLimiter, RateLimits};
