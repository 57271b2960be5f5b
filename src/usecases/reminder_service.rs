//! Reminder loop: scan every user's medicines on a fixed cycle and announce newly due doses.
//!
//! Runs as a tokio task beside the HTTP server. Shares the [`ReminderTracker`] with
//! `MedicineService`, so a dose answered through the API is not announced again.

use crate::domain::reminder::evaluate;
use crate::domain::{DomainError, ReminderTracker, ReminderWindow};
use crate::ports::{MedicineRepo, NotifierPort, UserRepo};
use chrono::NaiveDateTime;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct ReminderService {
    users: Arc<dyn UserRepo>,
    medicines: Arc<dyn MedicineRepo>,
    notifier: Arc<dyn NotifierPort>,
    tracker: Arc<Mutex<ReminderTracker>>,
    window: ReminderWindow,
    /// Sleep duration between cycles.
    cycle_sleep: Duration,
}

impl ReminderService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        medicines: Arc<dyn MedicineRepo>,
        notifier: Arc<dyn NotifierPort>,
        tracker: Arc<Mutex<ReminderTracker>>,
        window: ReminderWindow,
        cycle_sleep: Duration,
    ) -> Self {
        Self {
            users,
            medicines,
            notifier,
            tracker,
            window,
            cycle_sleep,
        }
    }

    /// Run forever: one pass over all users, then sleep. Errors are logged, never fatal.
    pub async fn run_loop(&self) {
        info!(
            cycle_secs = self.cycle_sleep.as_secs(),
            "reminder loop started"
        );
        loop {
            let now = chrono::Local::now().naive_local();
            match self.run_cycle(now).await {
                Ok(sent) if sent > 0 => info!(sent, "reminder cycle complete"),
                Ok(_) => debug!("reminder cycle complete; nothing due"),
                Err(e) => warn!(error = %e, "reminder cycle failed"),
            }
            tokio::time::sleep(self.cycle_sleep).await;
        }
    }

    /// One pass. Returns how many reminders were handed to the notifier.
    pub async fn run_cycle(&self, now: NaiveDateTime) -> Result<usize, DomainError> {
        let user_ids = self.users.list_user_ids().await?;
        let mut sent = 0;
        for user_id in &user_ids {
            match self.remind_user(user_id, now).await {
                Ok(n) => sent += n,
                Err(e) => warn!(user_id = %user_id, error = %e, "reminder check failed for user"),
            }
        }
        Ok(sent)
    }

    async fn remind_user(&self, user_id: &str, now: NaiveDateTime) -> Result<usize, DomainError> {
        let medicines = self.medicines.list_medicines(user_id).await?;
        if medicines.is_empty() {
            return Ok(0);
        }
        let reminders = evaluate(&medicines, now, self.window);
        let fresh = self
            .tracker
            .lock()
            .await
            .pending_due(user_id, &reminders, now.date());
        if fresh.is_empty() {
            return Ok(0);
        }

        let Some(user) = self.users.get_user(user_id).await? else {
            return Ok(0);
        };
        let mut sent = 0;
        for reminder in &fresh {
            match self.notifier.notify_reminder(&user, reminder).await {
                Ok(()) => {
                    self.tracker
                        .lock()
                        .await
                        .mark_announced(user_id, &reminder.medicine_id, now.date());
                    sent += 1;
                }
                // Left unmarked so the next cycle retries while the dose is still due.
                Err(e) => warn!(
                    user_id,
                    medicine_id = %reminder.medicine_id,
                    error = %e,
                    "failed to deliver reminder"
                ),
            }
        }
        Ok(sent)
    }
}
