//! Notification adapters. Implement NotifierPort.

pub mod alert;
pub mod http_mail;
pub mod log_notifier;

pub use alert::{render_alert, render_reminder};
pub use http_mail::HttpMailAdapter;
pub use log_notifier::LogNotifier;
