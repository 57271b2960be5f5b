//! AI adapter module. Implements AiPort for the medical assistant.
//!
//! Provides an OpenAI-compatible adapter, a mock adapter for testing, and the
//! text helpers used around assistant calls.

pub mod mock_adapter;
pub mod openai_adapter;
pub mod text;

pub use mock_adapter::MockAiAdapter;
pub use openai_adapter::OpenAiAdapter;
pub use text::{clean_response, extract_citations, extract_medical_terms};
