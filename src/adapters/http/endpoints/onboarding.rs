use crate::adapters::http::error::ApiError;
use crate::adapters::http::extract::JsonBody;
use crate::adapters::http::types::{AppContext, AuthUser};
use crate::usecases::onboarding_service::{
    BasicProfileRequest, HealthProfileRequest, MedicationsRequest, OnboardingStatus, StepResult,
};
use axum::extract::State;
use axum::{Extension, Json};

/// `GET /api/onboarding/status`
pub async fn status(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<OnboardingStatus>, ApiError> {
    Ok(Json(ctx.onboarding.status(&user.user_id).await?))
}

/// `POST /api/onboarding/profile/basic`
pub async fn basic(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<BasicProfileRequest>,
) -> Result<Json<StepResult>, ApiError> {
    Ok(Json(ctx.onboarding.update_basic(&user.user_id, req).await?))
}

/// `POST /api/onboarding/profile/health`
pub async fn health(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<HealthProfileRequest>,
) -> Result<Json<StepResult>, ApiError> {
    Ok(Json(ctx.onboarding.update_health(&user.user_id, req).await?))
}

/// `POST /api/onboarding/medications`
pub async fn medications(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<MedicationsRequest>,
) -> Result<Json<StepResult>, ApiError> {
    Ok(Json(ctx.onboarding.add_medications(&user.user_id, req).await?))
}

/// `POST /api/onboarding/complete`
pub async fn complete(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<StepResult>, ApiError> {
    Ok(Json(ctx.onboarding.complete(&user.user_id).await?))
}
