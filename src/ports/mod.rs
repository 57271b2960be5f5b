//! Port traits. API boundaries for the hexagon.
//!
//! Outbound only: the application calls into infrastructure through these.
//! The HTTP adapter drives the use cases directly.

pub mod notifier;
pub mod outbound;

pub use notifier::NotifierPort;
pub use outbound::{AiPort, EmergencyLogPort, MedicineRepo, TranscriberPort, UserRepo};
