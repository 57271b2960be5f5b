//! Profile read and update.

use crate::domain::validation::{normalize_email, require};
use crate::domain::{DomainError, EmergencyContact, HealthProfile, User};
use crate::ports::UserRepo;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Editable profile fields. Absent fields are left untouched; a `password`
/// key in the request body is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub phone_number: Option<String>,
    pub health_profile: Option<HealthProfile>,
    pub emergency_contacts: Option<Vec<EmergencyContact>>,
}

impl ProfileUpdate {
    fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.username.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.date_of_birth.is_none()
            && self.gender.is_none()
            && self.phone_number.is_none()
            && self.health_profile.is_none()
            && self.emergency_contacts.is_none()
    }
}

pub struct UserService {
    users: Arc<dyn UserRepo>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepo>) -> Self {
        Self { users }
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<User, DomainError> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("User not found".to_string()))
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<User, DomainError> {
        if update.is_empty() {
            return Err(DomainError::NotModified(
                "No changes made to profile".to_string(),
            ));
        }
        let current = self.get_profile(user_id).await?;
        let mut user = current.clone();

        if let Some(email) = update.email.as_deref() {
            let email = normalize_email(email)?;
            if email != current.email {
                if let Some(other) = self.users.find_by_email(&email).await? {
                    if other.id != user.id {
                        return Err(DomainError::Validation("Email already in use".to_string()));
                    }
                }
            }
            user.email = email;
        }
        if let Some(username) = update.username {
            let username = username.trim().to_string();
            if username.is_empty() {
                return Err(DomainError::missing_field("username"));
            }
            if username != current.username {
                if let Some(other) = self.users.find_by_username(&username).await? {
                    if other.id != user.id {
                        return Err(DomainError::Validation(
                            "Username already in use".to_string(),
                        ));
                    }
                }
            }
            user.username = username;
        }
        if let Some(v) = update.first_name.as_deref() {
            user.first_name = require(Some(v), "first_name")?.to_string();
        }
        if let Some(v) = update.last_name.as_deref() {
            user.last_name = require(Some(v), "last_name")?.to_string();
        }
        if let Some(v) = update.date_of_birth {
            user.profile.date_of_birth = Some(v);
        }
        if let Some(v) = update.gender {
            user.profile.gender = Some(v);
        }
        if let Some(v) = update.phone_number {
            user.profile.phone_number = Some(v);
        }
        if let Some(v) = update.health_profile {
            user.profile.health_profile = Some(v);
        }
        if let Some(v) = update.emergency_contacts {
            user.profile.emergency_contacts = v;
        }

        let unchanged = user.email == current.email
            && user.username == current.username
            && user.first_name == current.first_name
            && user.last_name == current.last_name
            && user.profile == current.profile;
        if unchanged {
            return Err(DomainError::NotModified(
                "No changes made to profile".to_string(),
            ));
        }

        user.updated_at = Utc::now();
        self.users.save_user(&user).await?;
        info!(user_id, "profile updated");
        Ok(user)
    }
}
