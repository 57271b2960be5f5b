//! OpenAI-compatible chat completions adapter.
//!
//! Works against OpenAI, Gemini's OpenAI-compatible endpoint, or a local Ollama.
//! Implements `AiPort` with plain-text answers.

use crate::domain::{ChatMessage, ChatRole, DomainError};
use crate::ports::AiPort;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const TEMPERATURE: f32 = 0.2;

/// OpenAI-compatible AI adapter.
pub struct OpenAiAdapter {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiAdapter {
    /// # Arguments
    /// * `api_url` - full `/chat/completions` endpoint
    /// * `api_key` - bearer key (can be empty for local Ollama)
    /// * `model` - model name, e.g. "gemini-2.0-flash"
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            model,
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// System instructions, prior turns oldest first, then the new question.
fn build_messages<'a>(
    system_prompt: &'a str,
    history: &'a [ChatMessage],
    question: &'a str,
) -> Vec<ApiMessage<'a>> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ApiMessage {
        role: "system",
        content: system_prompt,
    });
    messages.extend(history.iter().map(|m| ApiMessage {
        role: match m.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        },
        content: &m.content,
    }));
    messages.push(ApiMessage {
        role: "user",
        content: question,
    });
    messages
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: String,
}

#[async_trait::async_trait]
impl AiPort for OpenAiAdapter {
    async fn answer(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        question: &str,
    ) -> Result<String, DomainError> {
        info!(
            model = %self.model,
            question_len = question.len(),
            prior_turns = history.len(),
            "sending question to assistant"
        );

        let request = CompletionRequest {
            model: &self.model,
            messages: build_messages(system_prompt, history, question),
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::Ai(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "AI API returned error");
            return Err(DomainError::Ai(format!(
                "API error {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| DomainError::Ai(format!("Failed to parse API response: {}", e)))?;

        let answer = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| DomainError::Ai("No response choices returned".to_string()))?;

        debug!(answer_len = answer.len(), "received assistant answer");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_prior_turns_in_order() {
        let history = vec![
            ChatMessage::new(ChatRole::User, "what is HTN?"),
            ChatMessage::new(ChatRole::Assistant, "High blood pressure."),
        ];
        let req = CompletionRequest {
            model: "gemini-2.0-flash",
            messages: build_messages("be helpful", &history, "how do I lower it?"),
            temperature: TEMPERATURE,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["model"], "gemini-2.0-flash");
        let roles: Vec<_> = v["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(v["messages"][1]["content"], "what is HTN?");
        assert_eq!(v["messages"][3]["content"], "how do I lower it?");
        assert!((v["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn response_parses_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":" Rest. "}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.trim(), "Rest.");
    }
}
