//! Shared fixtures for use case tests.

use crate::adapters::persistence::SqliteRepo;
use crate::domain::{Profile, User};
use crate::ports::UserRepo;
use chrono::Utc;
use std::sync::Arc;
use tempfile::TempDir;

/// Low PBKDF2 cost keeps auth tests fast.
pub const ITERATIONS: u32 = 1_000;

/// A fresh database in a temp dir. Keep the `TempDir` alive for the test's duration.
pub async fn test_repo() -> (Arc<SqliteRepo>, TempDir) {
    let dir = TempDir::new().unwrap();
    let repo = SqliteRepo::connect(dir.path()).await.unwrap();
    (Arc::new(repo), dir)
}

pub async fn seed_user(repo: &Arc<SqliteRepo>, username: &str) -> User {
    let now = Utc::now();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: format!("{}@example.com", username),
        username: username.to_string(),
        password_hash: String::new(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        onboarding_step: 1,
        onboarding_complete: false,
        profile: Profile::default(),
        created_at: now,
        updated_at: now,
    };
    repo.insert_user(&user).await.unwrap();
    user
}
