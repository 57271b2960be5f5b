//! Registration, login, token refresh.

use crate::domain::validation::{normalize_email, require, validate_password};
use crate::domain::{DomainError, Profile, User};
use crate::ports::UserRepo;
use crate::shared::password::{hash_password, verify_password};
use crate::shared::token::{TokenError, TokenIssuer, TokenKind, TokenPair};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub onboarding_complete: bool,
    pub onboarding_step: u8,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

pub struct AuthService {
    users: Arc<dyn UserRepo>,
    tokens: Arc<TokenIssuer>,
    password_iterations: u32,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepo>, tokens: Arc<TokenIssuer>, password_iterations: u32) -> Self {
        Self {
            users,
            tokens,
            password_iterations,
        }
    }

    /// Create an account. Returns the new user id.
    pub async fn register(&self, req: RegisterRequest) -> Result<String, DomainError> {
        let email = require(req.email.as_deref(), "email")?;
        let password = req
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| DomainError::missing_field("password"))?;
        let username = require(req.username.as_deref(), "username")?;
        let first_name = require(req.first_name.as_deref(), "first_name")?;
        let last_name = require(req.last_name.as_deref(), "last_name")?;

        let email = normalize_email(email)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict("Email already registered".to_string()));
        }
        if self.users.find_by_username(username).await?.is_some() {
            return Err(DomainError::Conflict("Username already taken".to_string()));
        }
        validate_password(password)?;

        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            username: username.to_string(),
            password_hash: hash_password(password, self.password_iterations),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            onboarding_step: 1,
            onboarding_complete: false,
            profile: Profile::default(),
            created_at: now,
            updated_at: now,
        };
        self.users.insert_user(&user).await?;
        info!(user_id = %user.id, "user registered");
        Ok(user.id)
    }

    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, DomainError> {
        let (Some(email), Some(password)) = (req.email.as_deref(), req.password.as_deref()) else {
            return Err(DomainError::Validation(
                "Email and password are required".to_string(),
            ));
        };
        // An unparseable email cannot belong to anyone.
        let email = normalize_email(email)
            .map_err(|_| DomainError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| DomainError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;
        if !verify_password(password, &user.password_hash) {
            return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        info!(user_id = %user.id, "user logged in");
        Ok(LoginResponse {
            tokens: self.tokens.issue_pair(&user.id, Utc::now()),
            user_id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            onboarding_complete: user.onboarding_complete,
            onboarding_step: user.onboarding_step,
        })
    }

    /// Issue a fresh pair for a user authenticated by refresh token.
    pub async fn refresh(&self, user_id: &str) -> Result<TokenPair, DomainError> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("User not found".to_string()))?;
        Ok(self.tokens.issue_pair(&user.id, Utc::now()))
    }

    /// Resolve a bearer token to a user id.
    pub fn authenticate(&self, token: &str, kind: TokenKind) -> Result<String, DomainError> {
        self.tokens
            .verify(token, kind, Utc::now())
            .map(|claims| claims.user_id)
            .map_err(|e| {
                debug!(error = %e, ?kind, "token rejected");
                let message = match (e, kind) {
                    (TokenError::WrongType, _) => "Invalid token type",
                    (_, TokenKind::Access) => "Invalid or expired token",
                    (_, TokenKind::Refresh) => "Invalid or expired refresh token",
                };
                DomainError::Unauthorized(message.to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::{test_repo, ITERATIONS};

    fn register_req(email: &str, username: &str) -> RegisterRequest {
        RegisterRequest {
            email: Some(email.to_string()),
            password: Some("Passw0rd!".to_string()),
            username: Some(username.to_string()),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
        }
    }

    async fn service() -> (AuthService, tempfile::TempDir) {
        let (repo, dir) = test_repo().await;
        let tokens = Arc::new(TokenIssuer::new("secret", 3600, 7200));
        (AuthService::new(repo, tokens, ITERATIONS), dir)
    }

    #[tokio::test]
    async fn register_then_login() {
        let (svc, _dir) = service().await;
        let id = svc.register(register_req("ada@Example.com", "ada")).await.unwrap();

        let resp = svc
            .login(LoginRequest {
                email: Some("ada@example.com".to_string()),
                password: Some("Passw0rd!".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(resp.user_id, id);
        assert_eq!(resp.onboarding_step, 1);
        assert!(!resp.onboarding_complete);
        assert_eq!(
            svc.authenticate(&resp.tokens.access_token, TokenKind::Access).unwrap(),
            id
        );
        let err = svc
            .authenticate(&resp.tokens.access_token, TokenKind::Refresh)
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid token type");
        let err = svc.authenticate("garbage", TokenKind::Access).unwrap_err();
        assert_eq!(err.to_string(), "Invalid or expired token");
        let err = svc.authenticate("garbage", TokenKind::Refresh).unwrap_err();
        assert_eq!(err.to_string(), "Invalid or expired refresh token");
    }

    #[tokio::test]
    async fn duplicates_conflict() {
        let (svc, _dir) = service().await;
        svc.register(register_req("ada@example.com", "ada")).await.unwrap();

        let err = svc
            .register(register_req("ada@example.com", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(ref m) if m == "Email already registered"));

        let err = svc
            .register(register_req("new@example.com", "ada"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(ref m) if m == "Username already taken"));
    }

    #[tokio::test]
    async fn register_validates_fields_and_password() {
        let (svc, _dir) = service().await;
        let mut req = register_req("ada@example.com", "ada");
        req.last_name = None;
        let err = svc.register(req).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: last_name");

        let mut req = register_req("ada@example.com", "ada");
        req.password = Some("short".to_string());
        let err = svc.register(req).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized() {
        let (svc, _dir) = service().await;
        svc.register(register_req("ada@example.com", "ada")).await.unwrap();

        let wrong_pw = svc
            .login(LoginRequest {
                email: Some("ada@example.com".to_string()),
                password: Some("nope".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(wrong_pw, DomainError::Unauthorized(_)));

        let unknown = svc
            .login(LoginRequest {
                email: Some("ghost@example.com".to_string()),
                password: Some("Passw0rd!".to_string()),
            })
            .await
            .unwrap_err();
        assert_eq!(unknown.to_string(), INVALID_CREDENTIALS);

        let missing = svc.login(LoginRequest::default()).await.unwrap_err();
        assert!(matches!(missing, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn refresh_unknown_user_is_not_found() {
        let (svc, _dir) = service().await;
        assert!(matches!(
            svc.refresh("missing").await.unwrap_err(),
            DomainError::NotFound(_)
        ));
    }
}
