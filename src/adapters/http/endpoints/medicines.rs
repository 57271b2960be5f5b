//! Medicine CRUD, dose status, calendar, adherence and reminder polling.
//!
//! Day boundaries use the server's local clock.

use crate::adapters::http::error::ApiError;
use crate::adapters::http::extract::JsonBody;
use crate::adapters::http::types::{AppContext, AuthUser};
use crate::domain::{Medicine, Progress};
use crate::usecases::medicine_service::{
    MedicineInput, MedicineList, ReminderView, ScheduleView, StatusUpdate, TodayList,
};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Deserialize)]
pub struct ScheduleQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// `GET /api/user/medicines`
pub async fn list(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MedicineList>, ApiError> {
    Ok(Json(ctx.medicines.list(&user.user_id).await?))
}

/// `POST /api/user/medicines`
pub async fn add(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
    JsonBody(input): JsonBody<MedicineInput>,
) -> Result<(StatusCode, Json<Medicine>), ApiError> {
    let medicine = ctx.medicines.add(&user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(medicine)))
}

/// `PUT /api/user/medicines/:id`
pub async fn update(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<MedicineInput>,
) -> Result<Json<Medicine>, ApiError> {
    Ok(Json(ctx.medicines.update(&user.user_id, &id, patch).await?))
}

/// `DELETE /api/user/medicines/:id`
pub async fn delete(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    ctx.medicines.delete(&user.user_id, &id).await?;
    Ok(Json(MessageResponse {
        message: "Medicine deleted successfully",
    }))
}

/// `POST /api/user/medicines/:id/status`: body `{ "completed": bool }`.
pub async fn set_status(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<StatusUpdate>,
) -> Result<Json<MessageResponse>, ApiError> {
    ctx.medicines
        .set_status(&user.user_id, &id, update, local_now())
        .await?;
    Ok(Json(MessageResponse {
        message: "Medicine status updated successfully",
    }))
}

/// `GET /api/user/medicines/today`
pub async fn today(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<TodayList>, ApiError> {
    Ok(Json(
        ctx.medicines.today(&user.user_id, local_now().date()).await?,
    ))
}

/// `GET /api/user/medicines/schedule?start_date=YYYY-MM-DD&end_date=YYYY-MM-DD`
pub async fn schedule(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<ScheduleView>, ApiError> {
    let view = ctx
        .medicines
        .schedule(
            &user.user_id,
            query.start_date.as_deref(),
            query.end_date.as_deref(),
            local_now().date(),
        )
        .await?;
    Ok(Json(view))
}

/// `GET /api/user/medicines/progress`
pub async fn progress(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Progress>, ApiError> {
    Ok(Json(
        ctx.medicines
            .progress(&user.user_id, local_now().date())
            .await?,
    ))
}

/// `GET /api/user/medicines/reminders`
pub async fn reminders(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ReminderView>, ApiError> {
    Ok(Json(ctx.medicines.reminders(&user.user_id, local_now()).await?))
}
