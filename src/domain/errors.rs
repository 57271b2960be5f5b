//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these. The HTTP adapter maps each
//! variant onto a status code.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Bad or missing input. Message is shown to the client as-is.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation (email, username).
    #[error("{0}")]
    Conflict(String),

    /// Update accepted but nothing changed.
    #[error("{0}")]
    NotModified(String),

    #[error("Repository error: {0}")]
    Repo(String),

    #[error("AI assistant failed: {0}")]
    Ai(String),

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),
}

impl DomainError {
    pub fn missing_field(field: &str) -> Self {
        DomainError::Validation(format!("Missing required field: {}", field))
    }

    /// True for errors caused by infrastructure rather than the caller.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            DomainError::Repo(_)
                | DomainError::Ai(_)
                | DomainError::Notify(_)
                | DomainError::Transcription(_)
        )
    }
}
