//! Reminder evaluation: compare wall-clock time with each medicine's dose time.
//!
//! A medicine not yet taken today is *due* from `due_before` minutes ahead of its
//! time until `due_after` minutes past it, and *upcoming* up to `upcoming` minutes
//! ahead. [`ReminderTracker`] remembers which reminders were already delivered or
//! dismissed so each fires at most once per day.

use super::entities::Medicine;
use super::schedule::{is_completed_on, medicines_for_day};
use super::validation::parse_time;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use std::collections::HashSet;

/// Window sizes in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    pub due_before: i64,
    pub due_after: i64,
    pub upcoming: i64,
}

impl Default for ReminderWindow {
    fn default() -> Self {
        Self {
            due_before: 5,
            due_after: 30,
            upcoming: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderState {
    Due,
    Upcoming,
    Missed,
    Later,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reminder {
    pub medicine_id: String,
    pub name: String,
    pub dosage: String,
    pub time: String,
    pub state: ReminderState,
    /// Negative once the dose time has passed.
    pub minutes_until: i64,
}

fn minute_of_day(t: NaiveTime) -> i64 {
    (t.hour() * 60 + t.minute()) as i64
}

pub fn classify(dose: NaiveTime, now: NaiveTime, window: ReminderWindow) -> (ReminderState, i64) {
    let until = minute_of_day(dose) - minute_of_day(now);
    let state = if until < -window.due_after {
        ReminderState::Missed
    } else if until <= window.due_before {
        ReminderState::Due
    } else if until <= window.upcoming {
        ReminderState::Upcoming
    } else {
        ReminderState::Later
    };
    (state, until)
}

/// Due and upcoming reminders for medicines scheduled today and not yet taken.
/// Medicines with an unparseable time are skipped.
pub fn evaluate(medicines: &[Medicine], now: NaiveDateTime, window: ReminderWindow) -> Vec<Reminder> {
    let today = now.date();
    medicines_for_day(medicines, today)
        .into_iter()
        .filter(|m| !is_completed_on(m, today))
        .filter_map(|m| {
            let dose = parse_time(&m.time).ok()?;
            let (state, minutes_until) = classify(dose, now.time(), window);
            matches!(state, ReminderState::Due | ReminderState::Upcoming).then(|| Reminder {
                medicine_id: m.id.clone(),
                name: m.name.clone(),
                dosage: m.dosage.clone(),
                time: m.time.clone(),
                state,
                minutes_until,
            })
        })
        .collect()
}

/// Per-day memory of announced and dismissed reminders. Resets when the date changes.
#[derive(Debug, Default)]
pub struct ReminderTracker {
    day: Option<NaiveDate>,
    announced: HashSet<(String, String)>,
    dismissed: HashSet<(String, String)>,
}

impl ReminderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn roll(&mut self, today: NaiveDate) {
        if self.day != Some(today) {
            self.day = Some(today);
            self.announced.clear();
            self.dismissed.clear();
        }
    }

    /// Due reminders not yet announced or dismissed today. Nothing is marked;
    /// call [`mark_announced`](Self::mark_announced) once delivery succeeds.
    pub fn pending_due(
        &mut self,
        user_id: &str,
        reminders: &[Reminder],
        today: NaiveDate,
    ) -> Vec<Reminder> {
        self.roll(today);
        reminders
            .iter()
            .filter(|r| r.state == ReminderState::Due)
            .filter(|r| {
                let key = (user_id.to_string(), r.medicine_id.clone());
                !self.dismissed.contains(&key) && !self.announced.contains(&key)
            })
            .cloned()
            .collect()
    }

    pub fn mark_announced(&mut self, user_id: &str, medicine_id: &str, today: NaiveDate) {
        self.roll(today);
        self.announced
            .insert((user_id.to_string(), medicine_id.to_string()));
    }

    /// Suppress a medicine's reminder for the rest of `today`.
    pub fn dismiss(&mut self, user_id: &str, medicine_id: &str, today: NaiveDate) {
        self.roll(today);
        self.dismissed
            .insert((user_id.to_string(), medicine_id.to_string()));
    }

    pub fn is_dismissed(&mut self, user_id: &str, medicine_id: &str, today: NaiveDate) -> bool {
        self.roll(today);
        self.dismissed
            .contains(&(user_id.to_string(), medicine_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{DoseRecord, Schedule};
    use crate::domain::schedule::tests::med;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn classify_thresholds() {
        let w = ReminderWindow::default();
        let dose = t(8, 0);
        assert_eq!(classify(dose, t(6, 59), w).0, ReminderState::Later);
        assert_eq!(classify(dose, t(7, 0), w).0, ReminderState::Upcoming);
        assert_eq!(classify(dose, t(7, 54), w).0, ReminderState::Upcoming);
        assert_eq!(classify(dose, t(7, 55), w).0, ReminderState::Due);
        assert_eq!(classify(dose, t(8, 0), w), (ReminderState::Due, 0));
        assert_eq!(classify(dose, t(8, 30), w), (ReminderState::Due, -30));
        assert_eq!(classify(dose, t(8, 31), w).0, ReminderState::Missed);
    }

    #[test]
    fn evaluate_skips_taken_and_other_days() {
        let now = at(8, 10);
        let mut taken = med("taken", "08:00", Schedule::Daily);
        taken.history.push(DoseRecord {
            date: now.date(),
            taken_at: now,
            completed: true,
        });
        let due = med("due", "08:00", Schedule::Daily);
        let soon = med("soon", "08:50", Schedule::Daily);
        let later = med("later", "12:00", Schedule::Daily);
        let not_today = med("sun", "08:00", Schedule::Weekly { days: vec!["sunday".into()] });

        let out = evaluate(&[taken, due, soon, later, not_today], now, ReminderWindow::default());
        let got: Vec<_> = out.iter().map(|r| (r.medicine_id.as_str(), r.state)).collect();
        assert_eq!(
            got,
            vec![("due", ReminderState::Due), ("soon", ReminderState::Upcoming)]
        );
        assert_eq!(out[0].minutes_until, -10);
    }

    #[test]
    fn yesterdays_dose_does_not_count_today() {
        let now = at(8, 0);
        let mut m = med("a", "08:00", Schedule::Daily);
        m.history.push(DoseRecord {
            date: now.date().pred_opt().unwrap(),
            taken_at: now,
            completed: true,
        });
        assert_eq!(evaluate(&[m], now, ReminderWindow::default()).len(), 1);
    }

    #[test]
    fn tracker_announces_once_per_day() {
        let now = at(8, 0);
        let reminders = evaluate(&[med("a", "08:00", Schedule::Daily)], now, ReminderWindow::default());
        let mut tracker = ReminderTracker::new();

        // Still pending until marked.
        assert_eq!(tracker.pending_due("u1", &reminders, now.date()).len(), 1);
        assert_eq!(tracker.pending_due("u1", &reminders, now.date()).len(), 1);
        tracker.mark_announced("u1", "a", now.date());
        assert!(tracker.pending_due("u1", &reminders, now.date()).is_empty());
        // Another user with the same medicine id is tracked separately.
        assert_eq!(tracker.pending_due("u2", &reminders, now.date()).len(), 1);

        let tomorrow = now.date().succ_opt().unwrap();
        assert_eq!(tracker.pending_due("u1", &reminders, tomorrow).len(), 1);
    }

    #[test]
    fn dismissed_reminders_stay_quiet_until_tomorrow() {
        let now = at(8, 0);
        let reminders = evaluate(&[med("a", "08:00", Schedule::Daily)], now, ReminderWindow::default());
        let mut tracker = ReminderTracker::new();
        tracker.dismiss("u1", "a", now.date());

        assert!(tracker.is_dismissed("u1", "a", now.date()));
        assert!(tracker.pending_due("u1", &reminders, now.date()).is_empty());

        let tomorrow = now.date().succ_opt().unwrap();
        assert!(!tracker.is_dismissed("u1", "a", tomorrow));
    }

    #[test]
    fn upcoming_is_not_announced() {
        let now = at(7, 30);
        let reminders = evaluate(&[med("a", "08:00", Schedule::Daily)], now, ReminderWindow::default());
        assert_eq!(reminders[0].state, ReminderState::Upcoming);
        let mut tracker = ReminderTracker::new();
        assert!(tracker.pending_due("u1", &reminders, now.date()).is_empty());
    }
}
