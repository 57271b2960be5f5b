//! Application use cases. Orchestrate domain logic via ports.

pub mod auth_service;
pub mod chat_service;
pub mod emergency_service;
pub mod medicine_service;
pub mod onboarding_service;
pub mod reminder_service;
pub mod user_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth_service::AuthService;
pub use chat_service::ChatService;
pub use emergency_service::{EmergencyService, RetryPolicy};
pub use medicine_service::MedicineService;
pub use onboarding_service::OnboardingService;
pub use reminder_service::ReminderService;
pub use user_service::UserService;
