//! Medicine list management, calendar, adherence and reminder polling.
//!
//! Every call takes the caller's local `now` / `today` so the calendar math stays
//! testable; the HTTP layer passes the server's local clock.

use crate::domain::reminder::evaluate;
use crate::domain::schedule::{build_schedule, is_completed_on, medicines_for_day, progress_for_day, resolve_range};
use crate::domain::validation::{normalize_time, parse_date, require, schedule_from_parts};
use crate::domain::{
    DomainError, DoseRecord, Medicine, Progress, Reminder, ReminderState, ReminderTracker,
    ReminderWindow, Schedule, ScheduleEntry,
};
use crate::ports::MedicineRepo;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Medicine fields as clients send them. Used for both create (name, dosage,
/// time and frequency required) and partial update.
#[derive(Debug, Default, Deserialize)]
pub struct MedicineInput {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub time: Option<String>,
    pub frequency: Option<String>,
    pub days: Option<Vec<String>>,
    pub days_of_month: Option<Vec<u32>>,
    pub dates: Option<Vec<String>>,
    pub notes: Option<String>,
}

impl MedicineInput {
    fn touches_schedule(&self) -> bool {
        self.frequency.is_some()
            || self.days.is_some()
            || self.days_of_month.is_some()
            || self.dates.is_some()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusUpdate {
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct MedicineList {
    pub medicines: Vec<Medicine>,
}

#[derive(Debug, Serialize)]
pub struct TodayMedicine {
    #[serde(flatten)]
    pub medicine: Medicine,
    pub taken_today: bool,
}

#[derive(Debug, Serialize)]
pub struct TodayList {
    pub medicines: Vec<TodayMedicine>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleView {
    pub schedule: BTreeMap<NaiveDate, Vec<ScheduleEntry>>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Default, Serialize)]
pub struct ReminderView {
    pub due: Vec<Reminder>,
    pub upcoming: Vec<Reminder>,
}

fn schedule_parts(schedule: &Schedule) -> (Option<Vec<String>>, Option<Vec<u32>>, Option<Vec<String>>) {
    match schedule {
        Schedule::Daily => (None, None, None),
        Schedule::Weekly { days } => (Some(days.clone()), None, None),
        Schedule::Monthly { days_of_month } => (None, Some(days_of_month.clone()), None),
        Schedule::SpecificDates { dates } => (
            None,
            None,
            Some(dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect()),
        ),
    }
}

pub struct MedicineService {
    medicines: Arc<dyn MedicineRepo>,
    tracker: Arc<Mutex<ReminderTracker>>,
    window: ReminderWindow,
}

impl MedicineService {
    pub fn new(
        medicines: Arc<dyn MedicineRepo>,
        tracker: Arc<Mutex<ReminderTracker>>,
        window: ReminderWindow,
    ) -> Self {
        Self {
            medicines,
            tracker,
            window,
        }
    }

    pub async fn list(&self, user_id: &str) -> Result<MedicineList, DomainError> {
        Ok(MedicineList {
            medicines: self.medicines.list_medicines(user_id).await?,
        })
    }

    pub async fn today(&self, user_id: &str, today: NaiveDate) -> Result<TodayList, DomainError> {
        let all = self.medicines.list_medicines(user_id).await?;
        let medicines = medicines_for_day(&all, today)
            .into_iter()
            .map(|m| TodayMedicine {
                taken_today: is_completed_on(m, today),
                medicine: m.clone(),
            })
            .collect();
        Ok(TodayList { medicines })
    }

    pub async fn add(&self, user_id: &str, input: MedicineInput) -> Result<Medicine, DomainError> {
        let name = require(input.name.as_deref(), "name")?;
        let dosage = require(input.dosage.as_deref(), "dosage")?;
        let time = require(input.time.as_deref(), "time")?;
        let frequency = require(input.frequency.as_deref(), "frequency")?;

        let schedule = schedule_from_parts(
            frequency,
            input.days.as_deref(),
            input.days_of_month.as_deref(),
            input.dates.as_deref(),
        )?;
        let now = Utc::now();
        let medicine = Medicine {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            dosage: dosage.to_string(),
            time: normalize_time(time)?,
            schedule,
            notes: input.notes.filter(|n| !n.trim().is_empty()),
            last_status: None,
            last_taken: None,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
        };
        self.medicines.insert_medicine(&medicine).await?;
        info!(user_id, medicine_id = %medicine.id, frequency = medicine.schedule.frequency_name(), "medicine added");
        Ok(medicine)
    }

    pub async fn update(
        &self,
        user_id: &str,
        medicine_id: &str,
        patch: MedicineInput,
    ) -> Result<Medicine, DomainError> {
        let current = self
            .medicines
            .get_medicine(user_id, medicine_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Medicine not found".to_string()))?;
        let mut medicine = current.clone();

        if let Some(name) = patch.name.as_deref() {
            medicine.name = require(Some(name), "name")?.to_string();
        }
        if let Some(dosage) = patch.dosage.as_deref() {
            medicine.dosage = require(Some(dosage), "dosage")?.to_string();
        }
        if let Some(time) = patch.time.as_deref() {
            medicine.time = normalize_time(time)?;
        }
        if patch.touches_schedule() {
            // Fields the patch leaves out keep their current values.
            let (days, days_of_month, dates) = schedule_parts(&current.schedule);
            let frequency = patch
                .frequency
                .as_deref()
                .unwrap_or(current.schedule.frequency_name());
            medicine.schedule = schedule_from_parts(
                frequency,
                patch.days.as_deref().or(days.as_deref()),
                patch.days_of_month.as_deref().or(days_of_month.as_deref()),
                patch.dates.as_deref().or(dates.as_deref()),
            )?;
        }
        if let Some(notes) = patch.notes {
            medicine.notes = Some(notes).filter(|n| !n.trim().is_empty());
        }

        if medicine == current {
            return Err(DomainError::NotModified(
                "No changes made to medicine".to_string(),
            ));
        }
        medicine.updated_at = Utc::now();
        self.medicines.update_medicine(&medicine).await?;
        info!(user_id, medicine_id, "medicine updated");
        Ok(medicine)
    }

    pub async fn delete(&self, user_id: &str, medicine_id: &str) -> Result<(), DomainError> {
        if !self.medicines.delete_medicine(user_id, medicine_id).await? {
            return Err(DomainError::NotFound("Medicine not found".to_string()));
        }
        info!(user_id, medicine_id, "medicine deleted");
        Ok(())
    }

    /// Record a "taken / not taken" answer. Either answer silences today's reminder.
    pub async fn set_status(
        &self,
        user_id: &str,
        medicine_id: &str,
        update: StatusUpdate,
        now: NaiveDateTime,
    ) -> Result<(), DomainError> {
        let completed = update.completed.ok_or_else(|| {
            DomainError::Validation("Completed status is required".to_string())
        })?;
        let record = DoseRecord {
            date: now.date(),
            taken_at: now,
            completed,
        };
        if !self
            .medicines
            .record_dose(user_id, medicine_id, &record)
            .await?
        {
            return Err(DomainError::NotFound("Medicine not found".to_string()));
        }
        self.tracker
            .lock()
            .await
            .dismiss(user_id, medicine_id, now.date());
        info!(user_id, medicine_id, completed, "dose status recorded");
        Ok(())
    }

    pub async fn schedule(
        &self,
        user_id: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
        today: NaiveDate,
    ) -> Result<ScheduleView, DomainError> {
        let start = start_date
            .filter(|s| !s.trim().is_empty())
            .map(parse_date)
            .transpose()?;
        let end = end_date
            .filter(|s| !s.trim().is_empty())
            .map(parse_date)
            .transpose()?;
        let (start_date, end_date) = resolve_range(today, start, end)?;
        let medicines = self.medicines.list_medicines(user_id).await?;
        Ok(ScheduleView {
            schedule: build_schedule(&medicines, start_date, end_date),
            start_date,
            end_date,
        })
    }

    pub async fn progress(&self, user_id: &str, today: NaiveDate) -> Result<Progress, DomainError> {
        let medicines = self.medicines.list_medicines(user_id).await?;
        Ok(progress_for_day(&medicines, today))
    }

    /// Due and upcoming reminders, minus the ones answered or dismissed today.
    pub async fn reminders(
        &self,
        user_id: &str,
        now: NaiveDateTime,
    ) -> Result<ReminderView, DomainError> {
        let medicines = self.medicines.list_medicines(user_id).await?;
        let today = now.date();
        let mut tracker = self.tracker.lock().await;
        let mut view = ReminderView::default();
        for r in evaluate(&medicines, now, self.window) {
            if tracker.is_dismissed(user_id, &r.medicine_id, today) {
                continue;
            }
            match r.state {
                ReminderState::Due => view.due.push(r),
                ReminderState::Upcoming => view.upcoming.push(r),
                ReminderState::Missed | ReminderState::Later => {}
            }
        }
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::test_repo;
    use chrono::NaiveTime;

    const USER: &str = "user-1";

    fn monday() -> NaiveDate {
        // 2025-05-05 is a Monday.
        NaiveDate::from_ymd_opt(2025, 5, 5).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        monday().and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    fn input(name: &str, time: &str, frequency: &str) -> MedicineInput {
        MedicineInput {
            name: Some(name.to_string()),
            dosage: Some("1 tablet".to_string()),
            time: Some(time.to_string()),
            frequency: Some(frequency.to_string()),
            ..Default::default()
        }
    }

    async fn service() -> (MedicineService, tempfile::TempDir) {
        let (repo, dir) = test_repo().await;
        let svc = MedicineService::new(
            repo,
            Arc::new(Mutex::new(ReminderTracker::new())),
            ReminderWindow::default(),
        );
        (svc, dir)
    }

    #[tokio::test]
    async fn add_requires_fields_and_normalizes_time() {
        let (svc, _dir) = service().await;
        let mut req = input("Aspirin", "8:00", "daily");
        req.dosage = None;
        let err = svc.add(USER, req).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: dosage");

        let m = svc.add(USER, input("Aspirin", "8:00", "daily")).await.unwrap();
        assert_eq!(m.time, "08:00");
        assert_eq!(m.schedule, Schedule::Daily);

        let err = svc.add(USER, input("X", "08:00", "hourly")).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn today_filters_and_sorts() {
        let (svc, _dir) = service().await;
        svc.add(USER, input("Evening", "20:00", "daily")).await.unwrap();
        let mut weekly = input("Tuesday only", "07:00", "weekly");
        weekly.days = Some(vec!["Tuesday".to_string()]);
        svc.add(USER, weekly).await.unwrap();
        svc.add(USER, input("Morning", "08:00", "daily")).await.unwrap();

        let today = svc.today(USER, monday()).await.unwrap();
        let names: Vec<_> = today.medicines.iter().map(|m| m.medicine.name.as_str()).collect();
        assert_eq!(names, vec!["Morning", "Evening"]);
        assert!(today.medicines.iter().all(|m| !m.taken_today));
    }

    #[tokio::test]
    async fn status_marks_taken_and_updates_progress() {
        let (svc, _dir) = service().await;
        let a = svc.add(USER, input("A", "08:00", "daily")).await.unwrap();
        svc.add(USER, input("B", "09:00", "daily")).await.unwrap();

        let err = svc
            .set_status(USER, &a.id, StatusUpdate::default(), at(8, 5))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Completed status is required");

        svc.set_status(USER, &a.id, StatusUpdate { completed: Some(true) }, at(8, 5))
            .await
            .unwrap();
        let p = svc.progress(USER, monday()).await.unwrap();
        assert_eq!((p.total, p.completed, p.pending), (2, 1, 1));
        assert_eq!(p.progress, 50.0);

        // Taken yesterday does not count today.
        let tomorrow = monday().succ_opt().unwrap();
        assert_eq!(svc.progress(USER, tomorrow).await.unwrap().completed, 0);

        let err = svc
            .set_status(USER, "missing", StatusUpdate { completed: Some(true) }, at(8, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_patches_and_detects_no_change() {
        let (svc, _dir) = service().await;
        let m = svc.add(USER, input("A", "08:00", "daily")).await.unwrap();

        let updated = svc
            .update(
                USER,
                &m.id,
                MedicineInput {
                    frequency: Some("weekly".to_string()),
                    days: Some(vec!["monday".to_string(), "friday".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            updated.schedule,
            Schedule::Weekly {
                days: vec!["monday".to_string(), "friday".to_string()]
            }
        );
        assert_eq!(updated.created_at, m.created_at);

        let err = svc
            .update(
                USER,
                &m.id,
                MedicineInput {
                    name: Some("A".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No changes made to medicine");

        let err = svc
            .update(USER, "missing", MedicineInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Medicine not found");
    }

    #[tokio::test]
    async fn delete_unknown_is_not_found() {
        let (svc, _dir) = service().await;
        let m = svc.add(USER, input("A", "08:00", "daily")).await.unwrap();
        svc.delete(USER, &m.id).await.unwrap();
        assert_eq!(
            svc.delete(USER, &m.id).await.unwrap_err().to_string(),
            "Medicine not found"
        );
    }

    #[tokio::test]
    async fn schedule_defaults_to_current_week() {
        let (svc, _dir) = service().await;
        let mut monthly = input("Monthly", "08:00", "monthly");
        monthly.days_of_month = Some(vec![7]);
        svc.add(USER, monthly).await.unwrap();

        // Thursday 2025-05-08 -> week of Monday 05-05.
        let thursday = NaiveDate::from_ymd_opt(2025, 5, 8).unwrap();
        let view = svc.schedule(USER, None, None, thursday).await.unwrap();
        assert_eq!(view.start_date, monday());
        assert_eq!(view.end_date, NaiveDate::from_ymd_opt(2025, 5, 11).unwrap());
        assert_eq!(view.schedule.len(), 7);
        let wednesday = NaiveDate::from_ymd_opt(2025, 5, 7).unwrap();
        assert_eq!(view.schedule[&wednesday].len(), 1);
        assert!(view.schedule[&monday()].is_empty());

        let err = svc
            .schedule(USER, Some("2025-05-10"), Some("2025-05-01"), thursday)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn reminders_split_due_and_upcoming_and_respect_answers() {
        let (svc, _dir) = service().await;
        let due = svc.add(USER, input("Due", "08:00", "daily")).await.unwrap();
        svc.add(USER, input("Soon", "08:45", "daily")).await.unwrap();
        svc.add(USER, input("Later", "12:00", "daily")).await.unwrap();

        let view = svc.reminders(USER, at(7, 57)).await.unwrap();
        assert_eq!(view.due.len(), 1);
        assert_eq!(view.due[0].medicine_id, due.id);
        assert_eq!(view.upcoming.len(), 1);
        assert_eq!(view.upcoming[0].name, "Soon");

        svc.set_status(USER, &due.id, StatusUpdate { completed: Some(false) }, at(7, 58))
            .await
            .unwrap();
        let view = svc.reminders(USER, at(7, 59)).await.unwrap();
        assert!(view.due.is_empty());
    }
}
