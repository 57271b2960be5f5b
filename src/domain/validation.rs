//! Input validation rules: required fields, email shape, password strength,
//! dose times and schedule parts.

use super::entities::Schedule;
use super::errors::DomainError;
use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("static email regex")
});

const PASSWORD_SPECIALS: &str = "!@#$%^&*()_-+={}[]|:;<>,.?/~`";

pub const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Returns the trimmed value or a "Missing required field" error when absent or blank.
pub fn require<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, DomainError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DomainError::missing_field(field)),
    }
}

/// Validate and normalize an email address. The domain part is lower-cased.
pub fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim();
    if !EMAIL_RE.is_match(email) {
        return Err(DomainError::Validation(
            "The email address is not valid.".to_string(),
        ));
    }
    let (local, domain) = email
        .rsplit_once('@')
        .ok_or_else(|| DomainError::Validation("The email address is not valid.".to_string()))?;
    Ok(format!("{}@{}", local, domain.to_lowercase()))
}

/// Password strength rules. Returns the first rule that fails.
pub fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < 8 {
        return Err(DomainError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }
    if !password.chars().any(char::is_uppercase) || !password.chars().any(char::is_lowercase) {
        return Err(DomainError::Validation(
            "Password must contain both uppercase and lowercase letters".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(DomainError::Validation(
            "Password must contain at least one number".to_string(),
        ));
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err(DomainError::Validation(
            "Password must contain at least one special character".to_string(),
        ));
    }
    Ok(())
}

/// Parse a dose time ("8:00", "08:00" or "08:00:00") and return it as "HH:MM".
pub fn normalize_time(time: &str) -> Result<String, DomainError> {
    parse_time(time).map(|t| t.format("%H:%M").to_string())
}

pub fn parse_time(time: &str) -> Result<NaiveTime, DomainError> {
    let t = time.trim();
    NaiveTime::parse_from_str(t, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M:%S"))
        .map_err(|_| DomainError::Validation(format!("Invalid time '{}': expected HH:MM", t)))
}

pub fn parse_date(date: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
        DomainError::Validation(format!("Invalid date '{}': expected YYYY-MM-DD", date))
    })
}

/// Build a [`Schedule`] from the flat fields clients send.
pub fn schedule_from_parts(
    frequency: &str,
    days: Option<&[String]>,
    days_of_month: Option<&[u32]>,
    dates: Option<&[String]>,
) -> Result<Schedule, DomainError> {
    match frequency.trim().to_lowercase().as_str() {
        "daily" => Ok(Schedule::Daily),
        "weekly" => {
            let days = days.unwrap_or_default();
            if days.is_empty() {
                return Err(DomainError::Validation(
                    "Weekly medicines need at least one day".to_string(),
                ));
            }
            let mut normalized = Vec::with_capacity(days.len());
            for day in days {
                let d = day.trim().to_lowercase();
                if !WEEKDAYS.contains(&d.as_str()) {
                    return Err(DomainError::Validation(format!("Invalid day: {}", day)));
                }
                if !normalized.contains(&d) {
                    normalized.push(d);
                }
            }
            Ok(Schedule::Weekly { days: normalized })
        }
        "monthly" => {
            let days = days_of_month.unwrap_or_default();
            if days.is_empty() {
                return Err(DomainError::Validation(
                    "Monthly medicines need at least one day of month".to_string(),
                ));
            }
            if let Some(bad) = days.iter().find(|d| !(1..=31).contains(*d)) {
                return Err(DomainError::Validation(format!(
                    "Invalid day of month: {}",
                    bad
                )));
            }
            Ok(Schedule::Monthly {
                days_of_month: days.to_vec(),
            })
        }
        "specific_dates" => {
            let dates = dates.unwrap_or_default();
            if dates.is_empty() {
                return Err(DomainError::Validation(
                    "Specific-date medicines need at least one date".to_string(),
                ));
            }
            let parsed = dates
                .iter()
                .map(|d| parse_date(d))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Schedule::SpecificDates { dates: parsed })
        }
        other => Err(DomainError::Validation(format!(
            "Unsupported frequency: {}",
            other
        ))),
    }
}
