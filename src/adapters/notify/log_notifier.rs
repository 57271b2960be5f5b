//! Log-only notifier. Used when no mail relay is configured.
//!
//! Reminders are written to the log. Emails cannot be delivered, so every send
//! fails and the emergency flow reports the contact as not reached.

use crate::domain::{DomainError, OutgoingEmail, Reminder, User};
use crate::ports::NotifierPort;
use tracing::{info, warn};

pub const EMAIL_NOT_CONFIGURED: &str = "Email credentials not configured";

#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl NotifierPort for LogNotifier {
    async fn send_email(&self, email: &OutgoingEmail) -> Result<(), DomainError> {
        warn!(
            to = %email.to_email,
            subject = %email.subject,
            "mail relay not configured; email not sent"
        );
        Err(DomainError::Notify(EMAIL_NOT_CONFIGURED.to_string()))
    }

    fn can_send_email(&self) -> bool {
        false
    }

    async fn notify_reminder(&self, user: &User, reminder: &Reminder) -> Result<(), DomainError> {
        info!(
            user_id = %user.id,
            medicine_id = %reminder.medicine_id,
            medicine = %reminder.name,
            time = %reminder.time,
            minutes_until = reminder.minutes_until,
            "dose due"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn email_send_reports_failure() {
        let notifier = LogNotifier::new();
        let email = OutgoingEmail {
            to_email: "charles@example.com".into(),
            to_name: "Charles".into(),
            subject: "Emergency".into(),
            text: "help".into(),
            html: "<p>help</p>".into(),
        };
        let err = notifier.send_email(&email).await.unwrap_err();
        assert!(matches!(err, DomainError::Notify(ref m) if m == EMAIL_NOT_CONFIGURED));
        assert!(!notifier.can_send_email());
    }
}
