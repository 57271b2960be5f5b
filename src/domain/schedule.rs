//! Calendar rules: which medicines fall on which day, completion, progress.

use super::entities::{Medicine, Progress, Schedule, ScheduleEntry};
use super::errors::DomainError;
use super::validation::WEEKDAYS;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

/// Longest range served by the calendar view.
pub const MAX_RANGE_DAYS: i64 = 366;

fn weekday_name(date: NaiveDate) -> &'static str {
    WEEKDAYS[date.weekday().num_days_from_monday() as usize]
}

pub fn is_scheduled_on(medicine: &Medicine, date: NaiveDate) -> bool {
    match &medicine.schedule {
        Schedule::Daily => true,
        Schedule::Weekly { days } => {
            let today = weekday_name(date);
            days.iter().any(|d| d.eq_ignore_ascii_case(today))
        }
        Schedule::Monthly { days_of_month } => days_of_month.contains(&date.day()),
        Schedule::SpecificDates { dates } => dates.contains(&date),
    }
}

/// True when any dose record for `date` says the medicine was taken.
pub fn is_completed_on(medicine: &Medicine, date: NaiveDate) -> bool {
    medicine
        .history
        .iter()
        .any(|entry| entry.date == date && entry.completed)
}

/// Medicines scheduled on `date`, ordered by time of day.
pub fn medicines_for_day(medicines: &[Medicine], date: NaiveDate) -> Vec<&Medicine> {
    let mut out: Vec<&Medicine> = medicines
        .iter()
        .filter(|m| is_scheduled_on(m, date))
        .collect();
    out.sort_by(|a, b| a.time.cmp(&b.time));
    out
}

/// Resolve the calendar range. Start defaults to Monday of `today`'s week and
/// end to six days after start.
pub fn resolve_range(
    today: NaiveDate,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(NaiveDate, NaiveDate), DomainError> {
    let start = start.unwrap_or_else(|| {
        today - Duration::days(today.weekday().num_days_from_monday() as i64)
    });
    let end = end.unwrap_or_else(|| start + Duration::days(6));
    if end < start {
        return Err(DomainError::Validation(
            "end_date must not be before start_date".to_string(),
        ));
    }
    if (end - start).num_days() >= MAX_RANGE_DAYS {
        return Err(DomainError::Validation(format!(
            "Date range too large (max {} days)",
            MAX_RANGE_DAYS
        )));
    }
    Ok((start, end))
}

/// Day-by-day calendar for the inclusive range. Every day gets a key, even when empty.
pub fn build_schedule(
    medicines: &[Medicine],
    start: NaiveDate,
    end: NaiveDate,
) -> BTreeMap<NaiveDate, Vec<ScheduleEntry>> {
    let mut schedule = BTreeMap::new();
    let mut day = start;
    while day <= end {
        let entries = medicines_for_day(medicines, day)
            .into_iter()
            .map(|m| ScheduleEntry {
                id: m.id.clone(),
                name: m.name.clone(),
                dosage: m.dosage.clone(),
                time: m.time.clone(),
                completed: is_completed_on(m, day),
            })
            .collect();
        schedule.insert(day, entries);
        day += Duration::days(1);
    }
    schedule
}

pub fn progress_for_day(medicines: &[Medicine], date: NaiveDate) -> Progress {
    let scheduled = medicines_for_day(medicines, date);
    let total = scheduled.len() as u32;
    let completed = scheduled
        .iter()
        .filter(|m| is_completed_on(m, date))
        .count() as u32;
    let progress = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    };
    Progress {
        total,
        completed,
        pending: total - completed,
        progress,
    }
}
