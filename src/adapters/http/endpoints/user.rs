use crate::adapters::http::error::ApiError;
use crate::adapters::http::extract::JsonBody;
use crate::adapters::http::types::{AppContext, AuthUser};
use crate::domain::User;
use crate::usecases::user_service::ProfileUpdate;
use axum::extract::State;
use axum::{Extension, Json};

/// `GET /api/user/profile`
pub async fn get_profile(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(ctx.users.get_profile(&user.user_id).await?))
}

/// `PUT /api/user/profile`: partial update; 304 when nothing changed.
pub async fn update_profile(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(ctx.users.update_profile(&user.user_id, update).await?))
}
