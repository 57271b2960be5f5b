//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod reminder;
pub mod schedule;
pub mod validation;

pub use entities::{
    ChatMessage, ChatRole, ContactNotification, Coordinates, DoseRecord, EmergencyContact, EmergencyRequest,
    EmergencyStatus, HealthProfile, Medicine, OnboardingMedication, OutgoingEmail, Profile,
    Progress, Schedule, ScheduleEntry, User,
};
pub use errors::DomainError;
pub use reminder::{Reminder, ReminderState, ReminderTracker, ReminderWindow};
