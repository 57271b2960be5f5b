//! Medical assistant chat. Enrich the question, ask the AI with the user's
//! recent conversation, tidy the answer.
//!
//! Conversation history lives in memory per user and is lost on restart.

use crate::adapters::ai::{clean_response, extract_medical_terms};
use crate::domain::{ChatMessage, ChatRole, DomainError};
use crate::ports::AiPort;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub const EMPTY_PROMPT_REPLY: &str = "Please provide a medical question to continue.";

pub const FALLBACK_REPLY: &str = "I understand you have a medical question. While I can't access \
     my full capabilities right now, I recommend consulting healthcare resources for medical concerns.";

const SYSTEM_PROMPT: &str = "You are an AI medical assistant. Provide medically accurate \
     information and include citations to reliable sources when possible. Mention when \
     information should be verified by healthcare professionals.";

/// Messages kept per user (question and answer each count as one).
pub const MAX_HISTORY_MESSAGES: usize = 20;

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
}

pub struct ChatService {
    ai: Arc<dyn AiPort>,
    history: Mutex<HashMap<String, VecDeque<ChatMessage>>>,
}

impl ChatService {
    pub fn new(ai: Arc<dyn AiPort>) -> Self {
        Self {
            ai,
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Answer a question for `user_id`. Assistant failures degrade to
    /// [`FALLBACK_REPLY`] and are kept out of the history; only a missing
    /// prompt is an error.
    pub async fn ask(&self, user_id: &str, req: ChatRequest) -> Result<ChatReply, DomainError> {
        let prompt = req
            .prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| DomainError::Validation(EMPTY_PROMPT_REPLY.to_string()))?;

        let terms = extract_medical_terms(prompt);
        let question = if terms.is_empty() {
            prompt.to_string()
        } else {
            format!("{}\n\nDetected medical terms: {}", prompt, terms.join(", "))
        };

        // Snapshot so the lock is not held across the assistant call.
        let prior = self.history(user_id).await;
        let response = match self.ai.answer(SYSTEM_PROMPT, &prior, &question).await {
            Ok(answer) => {
                let response = clean_response(&answer);
                self.remember(user_id, prompt, &response).await;
                response
            }
            Err(e) => {
                warn!(user_id, error = %e, "assistant call failed; using fallback reply");
                clean_response(FALLBACK_REPLY)
            }
        };

        info!(
            user_id,
            terms = terms.len(),
            prior_turns = prior.len(),
            response_len = response.len(),
            "chat answered"
        );
        Ok(ChatReply { response })
    }

    /// The user's remembered conversation, oldest first.
    pub async fn history(&self, user_id: &str) -> Vec<ChatMessage> {
        self.history
            .lock()
            .await
            .get(user_id)
            .map(|turns| turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn remember(&self, user_id: &str, question: &str, answer: &str) {
        let mut all = self.history.lock().await;
        let turns = all.entry(user_id.to_string()).or_default();
        turns.push_back(ChatMessage::new(ChatRole::User, question));
        turns.push_back(ChatMessage::new(ChatRole::Assistant, answer));
        while turns.len() > MAX_HISTORY_MESSAGES {
            turns.pop_front();
        }
    }
}
