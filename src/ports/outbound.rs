//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    ChatMessage, DomainError, DoseRecord, EmergencyRequest, EmergencyStatus, Medicine, User,
};

/// Account storage. Email and username are unique across users.
#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a new user. Returns `DomainError::Conflict` if email or username is taken.
    async fn insert_user(&self, user: &User) -> Result<(), DomainError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, DomainError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;

    /// Overwrite the stored user (profile, onboarding state, identity fields).
    async fn save_user(&self, user: &User) -> Result<(), DomainError>;

    /// All user ids, for background scans.
    async fn list_user_ids(&self) -> Result<Vec<String>, DomainError>;
}

/// Medicine storage, always scoped to the owning user.
#[async_trait::async_trait]
pub trait MedicineRepo: Send + Sync {
    /// All medicines for a user with their dose history, in creation order.
    async fn list_medicines(&self, user_id: &str) -> Result<Vec<Medicine>, DomainError>;

    async fn get_medicine(
        &self,
        user_id: &str,
        medicine_id: &str,
    ) -> Result<Option<Medicine>, DomainError>;

    async fn insert_medicine(&self, medicine: &Medicine) -> Result<(), DomainError>;

    /// Overwrite the editable fields. History is never touched here.
    async fn update_medicine(&self, medicine: &Medicine) -> Result<(), DomainError>;

    /// Returns false when the medicine does not exist for this user.
    async fn delete_medicine(&self, user_id: &str, medicine_id: &str) -> Result<bool, DomainError>;

    /// Append a dose record and set `last_status`; `last_taken` moves only when completed.
    /// Returns false when the medicine does not exist for this user.
    async fn record_dose(
        &self,
        user_id: &str,
        medicine_id: &str,
        record: &DoseRecord,
    ) -> Result<bool, DomainError>;
}

/// Audit log of emergency help requests.
#[async_trait::async_trait]
pub trait EmergencyLogPort: Send + Sync {
    async fn log_emergency(&self, request: &EmergencyRequest) -> Result<(), DomainError>;

    async fn set_emergency_status(
        &self,
        request_id: &str,
        status: EmergencyStatus,
    ) -> Result<(), DomainError>;

    /// Newest first.
    async fn recent_emergencies(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<EmergencyRequest>, DomainError>;
}

/// Medical assistant (LLM) port.
#[async_trait::async_trait]
pub trait AiPort: Send + Sync {
    /// Answer a user question under the given system instructions.
    /// `history` holds earlier turns of the same conversation, oldest first.
    async fn answer(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        question: &str,
    ) -> Result<String, DomainError>;
}

/// Speech-to-text for emergency voice messages.
#[async_trait::async_trait]
pub trait TranscriberPort: Send + Sync {
    async fn transcribe(
        &self,
        audio: &[u8],
        file_name: &str,
        content_type: &str,
    ) -> Result<String, DomainError>;
}
