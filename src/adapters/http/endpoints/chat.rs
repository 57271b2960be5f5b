use crate::adapters::http::types::{AppContext, AuthUser};
use crate::domain::DomainError;
use crate::usecases::chat_service::{ChatReply, ChatRequest, EMPTY_PROMPT_REPLY};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};

/// `POST /api/chat`: `{ "prompt": ... }` in, `{ "response": ... }` out.
///
/// Always answers in the `response` shape, including the 400 for a blank prompt.
pub async fn ask(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Response {
    let req: ChatRequest = serde_json::from_slice(&body).unwrap_or_default();
    match ctx.chat.ask(&user.user_id, req).await {
        Ok(reply) => Json(reply).into_response(),
        Err(DomainError::Validation(_)) => (
            StatusCode::BAD_REQUEST,
            Json(ChatReply {
                response: EMPTY_PROMPT_REPLY.to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "chat request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatReply {
                    response: "An internal error occurred".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// `GET /api/chat/history`: the caller's remembered conversation, oldest first.
pub async fn history(
    State(ctx): State<AppContext>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    let messages = ctx.chat.history(&user.user_id).await;
    Json(serde_json::json!({ "messages": messages })).into_response()
}
