//! Cross-cutting helpers: configuration, credentials.

pub mod config;
pub mod password;
pub mod token;
