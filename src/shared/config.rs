//! Application configuration. Listen address, storage, secrets, integrations.

use crate::domain::ReminderWindow;
use serde::Deserialize;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

/// Development-only signing secret. A warning is logged when it is in use.
pub const DEV_JWT_SECRET: &str = "jwt_dev_secret";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Listen address. Read from MEDITRACK_BIND_ADDR.
    #[serde(default)]
    pub bind_addr: Option<String>,

    /// Directory holding meditrack.db. Read from MEDITRACK_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Key auth rate limits by the first X-Forwarded-For hop (default false).
    /// Enable only behind a reverse proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_for: Option<bool>,

    // ─────────────────────────────────────────────────────────────────────────
    // Authentication
    // ─────────────────────────────────────────────────────────────────────────
    /// HS256 signing secret for access and refresh tokens. Read from MEDITRACK_JWT_SECRET.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Access token lifetime in seconds (default 3600).
    #[serde(default)]
    pub access_token_ttl_secs: Option<i64>,

    /// Refresh token lifetime in seconds (default 30 days).
    #[serde(default)]
    pub refresh_token_ttl_secs: Option<i64>,

    /// PBKDF2 iterations for new password hashes (default 100000).
    #[serde(default)]
    pub password_iterations: Option<u32>,

    // ─────────────────────────────────────────────────────────────────────────
    // Medical assistant
    // ─────────────────────────────────────────────────────────────────────────
    /// Assistant API key. Read from MEDITRACK_AI_API_KEY.
    #[serde(default)]
    pub ai_api_key: Option<String>,

    /// OpenAI-compatible chat completions URL. Read from MEDITRACK_AI_API_URL.
    #[serde(default)]
    pub ai_api_url: Option<String>,

    /// Model name. Defaults to "gemini-2.0-flash".
    #[serde(default)]
    pub ai_model: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Emergency mail relay
    // ─────────────────────────────────────────────────────────────────────────
    #[serde(default)]
    pub mail_api_url: Option<String>,

    #[serde(default)]
    pub mail_api_key: Option<String>,

    /// Sender address for alerts. Read from MEDITRACK_MAIL_FROM.
    #[serde(default)]
    pub mail_from: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Voice message transcription
    // ─────────────────────────────────────────────────────────────────────────
    #[serde(default)]
    pub transcribe_api_url: Option<String>,

    #[serde(default)]
    pub transcribe_api_key: Option<String>,

    #[serde(default)]
    pub transcribe_model: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Reminders
    // ─────────────────────────────────────────────────────────────────────────
    /// Seconds between reminder scans (default 60).
    #[serde(default)]
    pub reminder_cycle_secs: Option<u64>,

    #[serde(default)]
    pub due_before_mins: Option<i64>,

    #[serde(default)]
    pub due_after_mins: Option<i64>,

    #[serde(default)]
    pub upcoming_mins: Option<i64>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("MEDITRACK"));
        if let Ok(path) = std::env::var("MEDITRACK_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    pub fn bind_addr_or_default(&self) -> String {
        self.bind_addr
            .clone()
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
    }

    pub fn data_dir_or_default(&self) -> String {
        self.data_dir.clone().unwrap_or_else(|| "./data".to_string())
    }

    pub fn trust_forwarded_for_or_default(&self) -> bool {
        self.trust_forwarded_for.unwrap_or(false)
    }

    pub fn jwt_secret_or_default(&self) -> String {
        self.jwt_secret
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEV_JWT_SECRET.to_string())
    }

    pub fn access_token_ttl_secs_or_default(&self) -> i64 {
        self.access_token_ttl_secs.unwrap_or(3600)
    }

    pub fn refresh_token_ttl_secs_or_default(&self) -> i64 {
        self.refresh_token_ttl_secs.unwrap_or(2_592_000)
    }

    pub fn password_iterations_or_default(&self) -> u32 {
        self.password_iterations.unwrap_or(100_000)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Integration helpers
    // ─────────────────────────────────────────────────────────────────────────

    pub fn ai_api_url_or_default(&self) -> String {
        self.ai_api_url.clone().unwrap_or_else(|| {
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions".to_string()
        })
    }

    pub fn ai_model_or_default(&self) -> String {
        self.ai_model
            .clone()
            .unwrap_or_else(|| "gemini-2.0-flash".to_string())
    }

    /// Returns true if the assistant is configured (API key present).
    pub fn is_ai_configured(&self) -> bool {
        self.ai_api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Returns true if the mail relay URL and key are both set.
    pub fn is_mail_configured(&self) -> bool {
        self.mail_api_url.is_some() && self.mail_api_key.is_some()
    }

    pub fn mail_from_or_default(&self) -> String {
        self.mail_from
            .clone()
            .unwrap_or_else(|| "alerts@meditrack.local".to_string())
    }

    pub fn is_transcription_configured(&self) -> bool {
        self.transcribe_api_url.is_some()
    }

    pub fn transcribe_model_or_default(&self) -> String {
        self.transcribe_model
            .clone()
            .unwrap_or_else(|| "whisper-1".to_string())
    }

    pub fn reminder_cycle_secs_or_default(&self) -> u64 {
        self.reminder_cycle_secs.unwrap_or(60).max(1)
    }

    pub fn reminder_window(&self) -> ReminderWindow {
        let d = ReminderWindow::default();
        ReminderWindow {
            due_before: self.due_before_mins.unwrap_or(d.due_before),
            due_after: self.due_after_mins.unwrap_or(d.due_after),
            upcoming: self.upcoming_mins.unwrap_or(d.upcoming),
        }
    }
}
