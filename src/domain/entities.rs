//! Domain entities. Pure data structures for the core business.
//!
//! No database or HTTP types here; adapters map rows and requests into these.
//! Field names follow the JSON the mobile and web clients already consume.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account with its profile and onboarding progress.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub onboarding_step: u8,
    pub onboarding_complete: bool,
    #[serde(flatten)]
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Display name used in alerts ("First Last", falling back to username).
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Profile fields collected during onboarding and editable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_profile: Option<HealthProfile>,
    #[serde(default)]
    pub emergency_contacts: Vec<EmergencyContact>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthProfile {
    #[serde(default)]
    pub health_conditions: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    /// Medications declared in the last onboarding step (not reminders).
    #[serde(default)]
    pub current_medications: Vec<OnboardingMedication>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingMedication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

/// When a medicine is taken. Serialized flat as `frequency` plus the matching list,
/// e.g. `{"frequency": "weekly", "days": ["monday"]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "frequency", rename_all = "snake_case")]
pub enum Schedule {
    Daily,
    Weekly { days: Vec<String> },
    Monthly { days_of_month: Vec<u32> },
    SpecificDates { dates: Vec<NaiveDate> },
}

impl Schedule {
    pub fn frequency_name(&self) -> &'static str {
        match self {
            Schedule::Daily => "daily",
            Schedule::Weekly { .. } => "weekly",
            Schedule::Monthly { .. } => "monthly",
            Schedule::SpecificDates { .. } => "specific_dates",
        }
    }
}

/// A medicine on a user's reminder list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(skip)]
    pub user_id: String,
    pub name: String,
    pub dosage: String,
    /// Time of day, "HH:MM" (24h, zero-padded).
    pub time: String,
    #[serde(flatten)]
    pub schedule: Schedule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub last_status: Option<bool>,
    #[serde(default)]
    pub last_taken: Option<NaiveDateTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub history: Vec<DoseRecord>,
}

/// One "taken / not taken" answer for a dose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseRecord {
    pub date: NaiveDate,
    pub taken_at: NaiveDateTime,
    pub completed: bool,
}

/// A medicine occurrence on a calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: String,
    pub name: String,
    pub dosage: String,
    pub time: String,
    pub completed: bool,
}

/// Completion counts for one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub total: u32,
    pub completed: u32,
    pub pending: u32,
    pub progress: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn maps_url(&self) -> String {
        format!(
            "https://maps.google.com/?q={},{}",
            self.latitude, self.longitude
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmergencyStatus {
    Pending,
    Notified,
    Failed,
}

impl EmergencyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyStatus::Pending => "pending",
            EmergencyStatus::Notified => "notified",
            EmergencyStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "notified" => EmergencyStatus::Notified,
            "failed" => EmergencyStatus::Failed,
            _ => EmergencyStatus::Pending,
        }
    }
}

/// A logged emergency help request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyRequest {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub transcription: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub status: EmergencyStatus,
}

/// Per-contact outcome of an emergency fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactNotification {
    pub name: String,
    pub email_sent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of a user's conversation with the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}
