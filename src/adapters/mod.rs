//! Infrastructure adapters. Implement outbound ports and expose the HTTP API.
//!
//! SQLite, assistant, mail relay, transcription. Map errors to DomainError.

pub mod ai;
pub mod http;
pub mod notify;
pub mod persistence;
pub mod transcribe;
