use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Path, Query};
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use serde::Deserialize;

use super::ApiState;
use crate::common::{ChatError, ChatMessage, ChatResult, MessageDraft, Participant, RegisterRequest};

/// Header carrying the caller's participant name.
pub const USER_HEADER: &str = "user";

#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Kept as raw text so bad values surface as validation errors.
    pub limit: Option<String>,
}

// Names arrive as UTF-8 in JSON bodies, so the header is decoded the same way
// rather than through the ASCII-only `HeaderValue::to_str`.
fn user_from_headers(headers: &HeaderMap) -> ChatResult<String> {
    let value = headers
        .get(USER_HEADER)
        .ok_or_else(|| ChatError::validation("missing User header"))?;
    let user = std::str::from_utf8(value.as_bytes())
        .map_err(|_| ChatError::validation("User header is not valid UTF-8"))?
        .trim();
    if user.is_empty() {
        return Err(ChatError::validation("User header must not be empty"));
    }
    Ok(user.to_string())
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ChatResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ChatError::Validation(rejection.body_text()))
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> ChatResult<T> {
    params
        .map(|Query(params)| params)
        .map_err(|rejection| ChatError::Validation(rejection.body_text()))
}

/// Run a store-backed operation on the blocking pool.
async fn blocking<T, F>(op: F) -> ChatResult<T>
where
    F: FnOnce() -> ChatResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op).await?
}

pub async fn register(
    Extension(state): Extension<ApiState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ChatResult<StatusCode> {
    let request = json_body(payload)?;
    let name = request.name.unwrap_or_default();
    let tracker = state.tracker.clone();
    blocking(move || tracker.register(&name, Utc::now())).await?;
    Ok(StatusCode::OK)
}

pub async fn list_participants(
    Extension(state): Extension<ApiState>,
) -> ChatResult<Json<Vec<Participant>>> {
    let tracker = state.tracker.clone();
    Ok(Json(blocking(move || tracker.participants()).await?))
}

pub async fn heartbeat(
    Extension(state): Extension<ApiState>,
    headers: HeaderMap,
) -> ChatResult<StatusCode> {
    let user = user_from_headers(&headers)?;
    let tracker = state.tracker.clone();
    blocking(move || tracker.heartbeat(&user, Utc::now())).await?;
    Ok(StatusCode::OK)
}

pub async fn post_message(
    Extension(state): Extension<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<MessageDraft>, JsonRejection>,
) -> ChatResult<(StatusCode, Json<ChatMessage>)> {
    let user = user_from_headers(&headers)?;
    let draft = json_body(payload)?;
    let board = state.board.clone();
    let message = blocking(move || board.post(&user, draft, Utc::now())).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_messages(
    Extension(state): Extension<ApiState>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ChatResult<Json<Vec<ChatMessage>>> {
    let user = user_from_headers(&headers)?;
    let params = query_params(params)?;
    let board = state.board.clone();
    let messages = blocking(move || board.list(&user, params.limit.as_deref())).await?;
    Ok(Json(messages))
}

pub async fn edit_message(
    Extension(state): Extension<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<MessageDraft>, JsonRejection>,
) -> ChatResult<Json<ChatMessage>> {
    let user = user_from_headers(&headers)?;
    let draft = json_body(payload)?;
    let board = state.board.clone();
    Ok(Json(blocking(move || board.edit(&user, &id, draft)).await?))
}

pub async fn delete_message(
    Extension(state): Extension<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ChatResult<StatusCode> {
    let user = user_from_headers(&headers)?;
    let board = state.board.clone();
    blocking(move || board.delete(&user, &id)).await?;
    Ok(StatusCode::OK)
}
