//! Request middleware: bearer authentication and per-client rate limiting.

pub mod auth;
pub mod rate;
