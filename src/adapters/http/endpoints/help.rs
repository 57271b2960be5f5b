//! Emergency help: multipart upload of a voice message plus optional location.
//!
//! Responses use the `{ status, message, data }` envelope the mobile client expects.

use crate::adapters::http::error::ApiError;
use crate::adapters::http::types::{AppContext, AuthUser};
use crate::domain::{Coordinates, EmergencyRequest};
use crate::usecases::emergency_service::{AudioUpload, HelpOutcome, HelpRequest};
use axum::extract::{Multipart, Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const DEFAULT_HISTORY_LIMIT: u32 = 10;
const MAX_HISTORY_LIMIT: u32 = 50;

#[derive(Serialize)]
pub struct HelpResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub data: HelpOutcome,
}

#[derive(Serialize)]
struct HelpErrorBody {
    status: &'static str,
    message: String,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub requests: Vec<EmergencyRequest>,
}

fn error_response(err: ApiError) -> Response {
    let status = err.status();
    let body = HelpErrorBody {
        status: "error",
        message: err.message(),
    };
    (status, Json(body)).into_response()
}

async fn read_form(mut multipart: Multipart) -> Result<HelpRequest, ApiError> {
    let mut req = HelpRequest::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                let file_name = field.file_name().unwrap_or("recording.m4a").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                req.audio = Some(AudioUpload {
                    bytes: bytes.to_vec(),
                    file_name,
                    content_type,
                });
            }
            "transcribe" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                req.transcribe = text.trim().eq_ignore_ascii_case("true");
            }
            "coordinates" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                match serde_json::from_str::<Coordinates>(&text) {
                    Ok(c) => {
                        info!(latitude = c.latitude, longitude = c.longitude, "received coordinates");
                        req.coordinates = Some(c);
                    }
                    Err(e) => warn!(error = %e, "ignoring unparseable coordinates"),
                }
            }
            _ => {}
        }
    }
    Ok(req)
}

/// `POST /api/help`
pub async fn send(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Response {
    let req = match read_form(multipart).await {
        Ok(req) => req,
        Err(e) => return error_response(e),
    };
    match ctx.emergency.send_help(&user.user_id, req).await {
        Ok(outcome) => Json(HelpResponse {
            status: "success",
            message: "Emergency help request processed successfully",
            data: outcome,
        })
        .into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// `GET /api/help/requests?limit=N`: the caller's most recent requests, newest first.
pub async fn history(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let requests = ctx.emergency.recent(&user.user_id, limit).await?;
    Ok(Json(HistoryResponse { requests }))
}
