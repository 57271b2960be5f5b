//! HTTP mail relay adapter. Implements NotifierPort by posting rendered emails
//! as JSON to a transactional mail API.

use super::alert::render_reminder;
use crate::domain::{DomainError, OutgoingEmail, Reminder, User};
use crate::ports::NotifierPort;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info};

/// Posts `{ from, to, subject, text, html, headers }` with a bearer key.
pub struct HttpMailAdapter {
    client: Arc<Client>,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailAdapter {
    /// # Arguments
    /// * `api_url` - relay endpoint accepting one message per POST
    /// * `api_key` - bearer key for the relay
    /// * `from` - sender, e.g. "MediTracker Emergency Alert <alerts@example.com>"
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            client: Arc::new(Client::new()),
            api_url,
            api_key,
            from,
        }
    }

    fn payload(&self, email: &OutgoingEmail, urgent: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "from": self.from,
            "to": format!("{} <{}>", email.to_name, email.to_email),
            "subject": email.subject,
            "text": email.text,
            "html": email.html,
        });
        if urgent {
            body["headers"] = serde_json::json!({
                "X-Priority": "1",
                "X-MSMail-Priority": "High",
                "Importance": "high",
                "Precedence": "urgent",
                "X-Emergency-Alert": "true",
                "X-Emergency-Type": "medical",
            });
        }
        body
    }

    async fn post(&self, body: &serde_json::Value) -> Result<(), DomainError> {
        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| DomainError::Notify(format!("Request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_else(|_| "unknown".to_string());
            return Err(DomainError::Notify(format!(
                "Mail relay error {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl NotifierPort for HttpMailAdapter {
    async fn send_email(&self, email: &OutgoingEmail) -> Result<(), DomainError> {
        self.post(&self.payload(email, true)).await?;
        info!(to = %email.to_email, "emergency email accepted by relay");
        Ok(())
    }

    async fn notify_reminder(&self, user: &User, reminder: &Reminder) -> Result<(), DomainError> {
        let email = render_reminder(user, &reminder.name, &reminder.dosage, &reminder.time);
        self.post(&self.payload(&email, false)).await?;
        debug!(user_id = %user.id, medicine_id = %reminder.medicine_id, "reminder email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to_name: "Charles".into(),
            to_email: "charles@example.com".into(),
            subject: "s".into(),
            text: "t".into(),
            html: "<p>h</p>".into(),
        }
    }

    #[test]
    fn urgent_payload_carries_priority_headers() {
        let adapter = HttpMailAdapter::new("http://relay".into(), "k".into(), "Alerts <a@x.io>".into());
        let body = adapter.payload(&email(), true);
        assert_eq!(body["to"], "Charles <charles@example.com>");
        assert_eq!(body["from"], "Alerts <a@x.io>");
        assert_eq!(body["headers"]["X-Priority"], "1");
        assert_eq!(body["headers"]["X-Emergency-Alert"], "true");
    }

    #[test]
    fn reminder_payload_has_no_priority_headers() {
        let adapter = HttpMailAdapter::new("http://relay".into(), "k".into(), "a@x.io".into());
        assert!(adapter.payload(&email(), false).get("headers").is_none());
    }

    #[tokio::test]
    async fn unreachable_relay_is_notify_error() {
        let adapter = HttpMailAdapter::new("http://127.0.0.1:9/send".into(), "k".into(), "a@x.io".into());
        let err = adapter.send_email(&email()).await.unwrap_err();
        assert!(matches!(err, DomainError::Notify(_)));
    }
}
