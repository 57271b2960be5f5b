//! OpenAI-compatible `/audio/transcriptions` client.

use crate::domain::DomainError;
use crate::ports::TranscriberPort;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{info, warn};

pub struct HttpTranscriber {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl HttpTranscriber {
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            model,
        }
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[async_trait::async_trait]
impl TranscriberPort for HttpTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        file_name: &str,
        content_type: &str,
    ) -> Result<String, DomainError> {
        info!(bytes = audio.len(), file_name, "sending audio for transcription");

        let part = Part::bytes(audio.to_vec())
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| DomainError::Transcription(format!("Bad content type: {}", e)))?;
        let form = Form::new()
            .text("model", self.model.clone())
            .part("file", part);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| DomainError::Transcription(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "transcription API returned error");
            return Err(DomainError::Transcription(format!(
                "API error {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let parsed: TranscriptionResponse = response.json().await.map_err(|e| {
            DomainError::Transcription(format!("Failed to parse API response: {}", e))
        })?;
        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Err(DomainError::Transcription(
                "Could not understand the audio message".to_string(),
            ));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_text_field() {
        let r: TranscriptionResponse =
            serde_json::from_str(r#"{"text":"help me","language":"en"}"#).unwrap();
        assert_eq!(r.text, "help me");
    }

    #[tokio::test]
    async fn invalid_content_type_rejected_before_request() {
        let t = HttpTranscriber::new("http://127.0.0.1:9".into(), "k".into(), "whisper-1".into());
        let err = t.transcribe(b"x", "a.m4a", "not a mime").await.unwrap_err();
        assert!(matches!(err, DomainError::Transcription(_)));
    }
}
