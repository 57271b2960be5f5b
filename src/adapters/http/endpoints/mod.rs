//! Route handlers, one module per resource.

pub mod auth;
pub mod chat;
pub mod health;
pub mod help;
pub mod medicines;
pub mod onboarding;
pub mod user;
