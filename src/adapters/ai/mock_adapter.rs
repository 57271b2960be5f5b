//! Mock AI adapter for development and tests. No network calls.

use crate::domain::{ChatMessage, DomainError};
use crate::ports::AiPort;
use std::time::Duration;
use tracing::info;

/// Returns a canned answer that echoes the question, after a simulated delay.
pub struct MockAiAdapter {
    delay_ms: u64,
    fail: bool,
}

impl MockAiAdapter {
    /// Default delay (100ms).
    pub fn new() -> Self {
        Self {
            delay_ms: 100,
            fail: false,
        }
    }

    pub fn with_delay(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            fail: false,
        }
    }

    /// Every call fails, for exercising fallback paths.
    pub fn failing() -> Self {
        Self {
            delay_ms: 0,
            fail: true,
        }
    }
}

impl Default for MockAiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AiPort for MockAiAdapter {
    async fn answer(
        &self,
        _system_prompt: &str,
        history: &[ChatMessage],
        question: &str,
    ) -> Result<String, DomainError> {
        info!(
            question_len = question.len(),
            prior_turns = history.len(),
            "[MOCK] Simulating assistant answer"
        );
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;

        if self.fail {
            return Err(DomainError::Ai("[MOCK] assistant unavailable".to_string()));
        }
        let first_line = question.lines().next().unwrap_or_default();
        Ok(format!(
            "[MOCK] You asked: \"{}\". Configure MEDITRACK_AI_API_KEY for real answers. \
             More information: https://medlineplus.gov/",
            first_line
        ))
    }
}
