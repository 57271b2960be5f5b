//! Onboarding flow: basic info (step 1) -> health info (step 2) -> medications (step 3).
//!
//! Each step stores its data and advances `onboarding_step`; the medications step
//! also completes onboarding.

use crate::domain::{DomainError, HealthProfile, OnboardingMedication, User};
use crate::ports::UserRepo;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const FINAL_STEP: u8 = 4;

#[derive(Debug, Serialize)]
pub struct OnboardingStatus {
    pub onboarding_complete: bool,
    pub onboarding_step: u8,
}

#[derive(Debug, Default, Deserialize)]
pub struct BasicProfileRequest {
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HealthProfileRequest {
    pub health_conditions: Option<Vec<String>>,
    pub allergies: Option<Vec<String>>,
    pub height: Option<serde_json::Value>,
    pub weight: Option<serde_json::Value>,
    pub blood_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MedicationEntry {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MedicationsRequest {
    pub medications: Option<Vec<MedicationEntry>>,
}

#[derive(Debug, Serialize)]
pub struct StepResult {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_complete: Option<bool>,
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub struct OnboardingService {
    users: Arc<dyn UserRepo>,
}

impl OnboardingService {
    pub fn new(users: Arc<dyn UserRepo>) -> Self {
        Self { users }
    }

    async fn load(&self, user_id: &str) -> Result<User, DomainError> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("User not found".to_string()))
    }

    async fn advance(&self, mut user: User, step: u8, complete: bool) -> Result<(), DomainError> {
        user.onboarding_step = step;
        user.onboarding_complete = complete;
        user.updated_at = Utc::now();
        self.users.save_user(&user).await?;
        info!(user_id = %user.id, step, complete, "onboarding advanced");
        Ok(())
    }

    pub async fn status(&self, user_id: &str) -> Result<OnboardingStatus, DomainError> {
        let user = self.load(user_id).await?;
        Ok(OnboardingStatus {
            onboarding_complete: user.onboarding_complete,
            onboarding_step: user.onboarding_step,
        })
    }

    pub async fn update_basic(
        &self,
        user_id: &str,
        req: BasicProfileRequest,
    ) -> Result<StepResult, DomainError> {
        let date_of_birth = req
            .date_of_birth
            .ok_or_else(|| DomainError::missing_field("date_of_birth"))?;
        let gender = req
            .gender
            .ok_or_else(|| DomainError::missing_field("gender"))?;

        let mut user = self.load(user_id).await?;
        user.profile.date_of_birth = Some(date_of_birth);
        user.profile.gender = Some(gender);
        if req.phone_number.is_some() {
            user.profile.phone_number = req.phone_number;
        }
        let complete = user.onboarding_complete;
        self.advance(user, 2, complete).await?;

        Ok(StepResult {
            message: "Basic profile updated",
            next_step: Some(2),
            onboarding_complete: None,
        })
    }

    pub async fn update_health(
        &self,
        user_id: &str,
        req: HealthProfileRequest,
    ) -> Result<StepResult, DomainError> {
        let health_conditions = req.health_conditions.ok_or_else(|| {
            DomainError::Validation("Health conditions must be provided as a list".to_string())
        })?;
        let allergies = req.allergies.ok_or_else(|| {
            DomainError::Validation("Allergies must be provided as a list".to_string())
        })?;

        let mut user = self.load(user_id).await?;
        let current_medications = user
            .profile
            .health_profile
            .take()
            .map(|h| h.current_medications)
            .unwrap_or_default();
        user.profile.health_profile = Some(HealthProfile {
            health_conditions,
            allergies,
            height: req.height,
            weight: req.weight,
            blood_type: req.blood_type,
            current_medications,
        });
        let complete = user.onboarding_complete;
        self.advance(user, 3, complete).await?;

        Ok(StepResult {
            message: "Health profile updated",
            next_step: Some(3),
            onboarding_complete: None,
        })
    }

    pub async fn add_medications(
        &self,
        user_id: &str,
        req: MedicationsRequest,
    ) -> Result<StepResult, DomainError> {
        let entries = req.medications.ok_or_else(|| {
            DomainError::Validation("Medications must be provided as a list".to_string())
        })?;

        let mut medications = Vec::with_capacity(entries.len());
        for entry in &entries {
            let name = non_blank(&entry.name).ok_or_else(|| {
                DomainError::Validation("Each medication must have a name".to_string())
            })?;
            let dosage = non_blank(&entry.dosage).ok_or_else(|| {
                DomainError::Validation("Each medication must have a dosage".to_string())
            })?;
            let frequency = non_blank(&entry.frequency).ok_or_else(|| {
                DomainError::Validation("Each medication must have a frequency".to_string())
            })?;
            medications.push(OnboardingMedication {
                name: name.to_string(),
                dosage: dosage.to_string(),
                frequency: frequency.to_string(),
            });
        }

        let mut user = self.load(user_id).await?;
        user.profile
            .health_profile
            .get_or_insert_with(HealthProfile::default)
            .current_medications = medications;
        self.advance(user, FINAL_STEP, true).await?;

        Ok(StepResult {
            message: "Medications added",
            next_step: None,
            onboarding_complete: Some(true),
        })
    }

    pub async fn complete(&self, user_id: &str) -> Result<StepResult, DomainError> {
        let user = self.load(user_id).await?;
        self.advance(user, FINAL_STEP, true).await?;
        Ok(StepResult {
            message: "Onboarding completed successfully",
            next_step: None,
            onboarding_complete: None,
        })
    }
}
