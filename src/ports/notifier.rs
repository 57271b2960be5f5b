//! Notifier outbound port. Deliver emergency emails and dose reminders.

use crate::domain::{DomainError, OutgoingEmail, Reminder, User};

/// Port for pushing messages out of the service.
///
/// Implemented by adapters (HTTP mail relay, log-only). When no relay is
/// configured the log notifier stands in: reminders are logged and every
/// email send fails.
#[async_trait::async_trait]
pub trait NotifierPort: Send + Sync {
    /// Deliver one rendered email.
    ///
    /// # Errors
    /// Returns `DomainError::Notify` if the relay rejects the message or is unreachable.
    async fn send_email(&self, email: &OutgoingEmail) -> Result<(), DomainError>;

    /// False when no email transport exists, so retrying a failed send is pointless.
    fn can_send_email(&self) -> bool {
        true
    }

    /// Announce a newly due dose for `user`.
    async fn notify_reminder(&self, user: &User, reminder: &Reminder) -> Result<(), DomainError>;
}
