//! Emergency help: transcribe the voice message, log the request, alert every
//! emergency contact by email.

use crate::adapters::notify::render_alert;
use crate::domain::{
    ContactNotification, Coordinates, DomainError, EmergencyRequest, EmergencyStatus,
    OutgoingEmail, User,
};
use crate::ports::{EmergencyLogPort, NotifierPort, TranscriberPort, UserRepo};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const TRANSCRIPTION_FAILED: &str = "Error transcribing audio message";

/// Per-email delivery retry: `max_attempts` tries, delay doubling from `initial_delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct HelpRequest {
    pub audio: Option<AudioUpload>,
    pub transcribe: bool,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HelpOutcome {
    pub transcription: Option<String>,
    pub notifications_sent: Vec<ContactNotification>,
}

pub struct EmergencyService {
    users: Arc<dyn UserRepo>,
    log: Arc<dyn EmergencyLogPort>,
    notifier: Arc<dyn NotifierPort>,
    transcriber: Option<Arc<dyn TranscriberPort>>,
    retry: RetryPolicy,
}

impl EmergencyService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        log: Arc<dyn EmergencyLogPort>,
        notifier: Arc<dyn NotifierPort>,
        transcriber: Option<Arc<dyn TranscriberPort>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            users,
            log,
            notifier,
            transcriber,
            retry,
        }
    }

    pub async fn send_help(
        &self,
        user_id: &str,
        req: HelpRequest,
    ) -> Result<HelpOutcome, DomainError> {
        let audio = req
            .audio
            .filter(|a| !a.bytes.is_empty())
            .ok_or_else(|| DomainError::Validation("No audio file provided".to_string()))?;
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("User not found".to_string()))?;

        let transcription = if req.transcribe {
            self.transcribe(&audio).await
        } else {
            None
        };

        let request = EmergencyRequest {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            created_at: Utc::now(),
            transcription: transcription.clone(),
            coordinates: req.coordinates,
            status: EmergencyStatus::Pending,
        };
        self.log.log_emergency(&request).await?;
        info!(
            user_id,
            request_id = %request.id,
            has_location = request.coordinates.is_some(),
            "emergency request logged"
        );

        let notifications = self
            .notify_contacts(&user, transcription.as_deref(), req.coordinates)
            .await;

        let status = if notifications.iter().any(|n| n.email_sent) {
            info!(user_id, "emergency notifications sent");
            EmergencyStatus::Notified
        } else {
            error!(user_id, "no emergency notification was delivered");
            EmergencyStatus::Failed
        };
        if let Err(e) = self.log.set_emergency_status(&request.id, status).await {
            warn!(request_id = %request.id, error = %e, "failed to update emergency status");
        }

        Ok(HelpOutcome {
            transcription,
            notifications_sent: notifications,
        })
    }

    pub async fn recent(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<EmergencyRequest>, DomainError> {
        self.log.recent_emergencies(user_id, limit).await
    }

    /// `None` when no transcriber is configured; a fixed message on failure.
    async fn transcribe(&self, audio: &AudioUpload) -> Option<String> {
        let Some(transcriber) = &self.transcriber else {
            warn!("transcription requested but no transcriber configured");
            return None;
        };
        match transcriber
            .transcribe(&audio.bytes, &audio.file_name, &audio.content_type)
            .await
        {
            Ok(text) => {
                info!(len = text.len(), "emergency message transcribed");
                Some(text)
            }
            Err(e) => {
                error!(error = %e, "transcription failed");
                Some(TRANSCRIPTION_FAILED.to_string())
            }
        }
    }

    async fn notify_contacts(
        &self,
        user: &User,
        transcription: Option<&str>,
        coordinates: Option<Coordinates>,
    ) -> Vec<ContactNotification> {
        let contacts = &user.profile.emergency_contacts;
        if contacts.is_empty() {
            warn!(user_id = %user.id, "no emergency contacts in profile");
        }
        let mut results = Vec::with_capacity(contacts.len());
        for contact in contacts {
            let email_sent = match contact.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
                Some(address) => {
                    let email = render_alert(&contact.name, address, user, transcription, coordinates);
                    self.deliver(&email).await
                }
                None => {
                    warn!(contact = %contact.name, "no email address for contact");
                    false
                }
            };
            results.push(ContactNotification {
                name: contact.name.clone(),
                email_sent,
            });
        }
        results
    }

    async fn deliver(&self, email: &OutgoingEmail) -> bool {
        let max_attempts = if self.notifier.can_send_email() {
            self.retry.max_attempts.max(1)
        } else {
            1
        };
        let mut delay = self.retry.initial_delay;
        for attempt in 1..=max_attempts {
            match self.notifier.send_email(email).await {
                Ok(()) => return true,
                Err(e) if attempt < max_attempts => {
                    warn!(
                        to = %email.to_email,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "emergency email failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    error!(to = %email.to_email, attempt, error = %e, "emergency email failed");
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EmergencyContact, Reminder};
    use crate::usecases::test_support::{seed_user, test_repo};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Fails the first `fail_first` sends, then records deliveries.
    #[derive(Default)]
    struct FlakyNotifier {
        fail_first: u32,
        calls: AtomicU32,
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl NotifierPort for FlakyNotifier {
        async fn send_email(&self, email: &OutgoingEmail) -> Result<(), DomainError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(DomainError::Notify("relay down".into()));
            }
            self.delivered.lock().unwrap().push(email.to_email.clone());
            Ok(())
        }

        async fn notify_reminder(&self, _: &User, _: &Reminder) -> Result<(), DomainError> {
            Ok(())
        }
    }

    struct FixedTranscriber(Result<&'static str, ()>);

    #[async_trait::async_trait]
    impl TranscriberPort for FixedTranscriber {
        async fn transcribe(&self, _: &[u8], _: &str, _: &str) -> Result<String, DomainError> {
            self.0
                .map(str::to_string)
                .map_err(|_| DomainError::Transcription("boom".into()))
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::ZERO,
        }
    }

    fn audio() -> Option<AudioUpload> {
        Some(AudioUpload {
            bytes: vec![1, 2, 3],
            file_name: "help.m4a".into(),
            content_type: "audio/m4a".into(),
        })
    }

    fn contact(name: &str, email: Option<&str>) -> EmergencyContact {
        EmergencyContact {
            name: name.into(),
            email: email.map(str::to_string),
            phone: None,
            relationship: None,
        }
    }

    async fn user_with_contacts(
        repo: &Arc<crate::adapters::persistence::SqliteRepo>,
        contacts: Vec<EmergencyContact>,
    ) -> User {
        let mut user = seed_user(repo, "ada").await;
        user.profile.emergency_contacts = contacts;
        repo.save_user(&user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn audio_is_required() {
        let (repo, _dir) = test_repo().await;
        let user = seed_user(&repo, "ada").await;
        let svc = EmergencyService::new(
            repo.clone(),
            repo,
            Arc::new(FlakyNotifier::default()),
            None,
            fast_retry(),
        );
        let err = svc.send_help(&user.id, HelpRequest::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "No audio file provided");
    }

    #[tokio::test]
    async fn notifies_contacts_with_email_and_logs_request() {
        let (repo, _dir) = test_repo().await;
        let user = user_with_contacts(
            &repo,
            vec![contact("Charles", Some("charles@example.com")), contact("Mary", None)],
        )
        .await;
        let notifier = Arc::new(FlakyNotifier::default());
        let svc = EmergencyService::new(
            repo.clone(),
            repo.clone(),
            notifier.clone(),
            Some(Arc::new(FixedTranscriber(Ok("I fell")))),
            fast_retry(),
        );

        let out = svc
            .send_help(
                &user.id,
                HelpRequest {
                    audio: audio(),
                    transcribe: true,
                    coordinates: Some(Coordinates {
                        latitude: 1.0,
                        longitude: 2.0,
                    }),
                },
            )
            .await
            .unwrap();

        assert_eq!(out.transcription.as_deref(), Some("I fell"));
        assert_eq!(
            out.notifications_sent,
            vec![
                ContactNotification {
                    name: "Charles".into(),
                    email_sent: true
                },
                ContactNotification {
                    name: "Mary".into(),
                    email_sent: false
                },
            ]
        );
        assert_eq!(
            *notifier.delivered.lock().unwrap(),
            vec!["charles@example.com".to_string()]
        );

        let logged = svc.recent(&user.id, 5).await.unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].status, EmergencyStatus::Notified);
        assert_eq!(logged[0].transcription.as_deref(), Some("I fell"));
    }

    #[tokio::test]
    async fn without_mail_relay_contacts_are_not_reached() {
        let (repo, _dir) = test_repo().await;
        let user = user_with_contacts(&repo, vec![contact("Charles", Some("c@example.com"))]).await;
        let svc = EmergencyService::new(
            repo.clone(),
            repo.clone(),
            Arc::new(crate::adapters::notify::LogNotifier::new()),
            None,
            RetryPolicy::default(),
        );

        // Default retry delays would take seconds; an unconfigured relay gets one attempt.
        let out = tokio::time::timeout(
            Duration::from_secs(1),
            svc.send_help(
                &user.id,
                HelpRequest {
                    audio: audio(),
                    ..Default::default()
                },
            ),
        )
        .await
        .expect("no retry delay without a relay")
        .unwrap();
        assert_eq!(
            out.notifications_sent,
            vec![ContactNotification {
                name: "Charles".into(),
                email_sent: false
            }]
        );
        let logged = svc.recent(&user.id, 5).await.unwrap();
        assert_eq!(logged[0].status, EmergencyStatus::Failed);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let (repo, _dir) = test_repo().await;
        let user = user_with_contacts(&repo, vec![contact("Charles", Some("c@example.com"))]).await;
        let notifier = Arc::new(FlakyNotifier {
            fail_first: 2,
            ..Default::default()
        });
        let svc = EmergencyService::new(repo.clone(), repo, notifier.clone(), None, fast_retry());

        let out = svc
            .send_help(
                &user.id,
                HelpRequest {
                    audio: audio(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(out.notifications_sent[0].email_sent);
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 3);
        assert!(out.transcription.is_none());
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts_and_marks_failed() {
        let (repo, _dir) = test_repo().await;
        let user = user_with_contacts(&repo, vec![contact("Charles", Some("c@example.com"))]).await;
        let notifier = Arc::new(FlakyNotifier {
            fail_first: 10,
            ..Default::default()
        });
        let svc = EmergencyService::new(
            repo.clone(),
            repo.clone(),
            notifier.clone(),
            Some(Arc::new(FixedTranscriber(Err(())))),
            fast_retry(),
        );

        let out = svc
            .send_help(
                &user.id,
                HelpRequest {
                    audio: audio(),
                    transcribe: true,
                    coordinates: None,
                },
            )
            .await
            .unwrap();
        assert!(!out.notifications_sent[0].email_sent);
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 3);
        assert_eq!(out.transcription.as_deref(), Some(TRANSCRIPTION_FAILED));
        assert_eq!(
            svc.recent(&user.id, 1).await.unwrap()[0].status,
            EmergencyStatus::Failed
        );
    }
}
