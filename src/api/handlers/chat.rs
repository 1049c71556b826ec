//! Read-only chat endpoints: message history and channel status.
//!
//! Every endpoint here requires the same bearer credential as WebSocket
//! admission; the REST surface never serves history anonymously.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ChatStatusResponse, HistoryParams, MessageListResponse, MessageResponse};
use crate::api::extract::RequireIdentity;
use crate::app_state::AppState;
use crate::error::ChatError;

/// `GET /api/chat/messages` — Paginated message history.
///
/// # Errors
///
/// Returns [`ChatError::Unauthorized`] without a valid bearer token, or
/// a [`ChatError`] when the store lookup fails.
#[utoipa::path(
    get,
    path = "/api/chat/messages",
    tag = "Chat",
    summary = "Message history",
    description = "Returns one page of the room's visible messages, newest first. \
                   Soft-deleted messages are excluded. Requires a bearer token.",
    params(
        ("page" = Option<u32>, Query, description = "Page number (1-indexed)"),
        ("page_size" = Option<u32>, Query, description = "Messages per page (max 100)"),
    ),
    responses(
        (status = 200, description = "One page of history", body = MessageListResponse),
        (status = 401, description = "Missing or invalid bearer token"),
    )
)]
pub async fn history_handler(
    State(state): State<AppState>,
    RequireIdentity(_identity): RequireIdentity,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ChatError> {
    let params = params.clamped();
    let (messages, total_count) = state
        .chat_service
        .history(params.page, params.page_size)
        .await?;

    let shown = u64::from(params.page) * u64::from(params.page_size);
    Ok(Json(MessageListResponse {
        messages: messages.iter().map(MessageResponse::from).collect(),
        total_count,
        page: params.page,
        page_size: params.page_size,
        has_more: shown < total_count,
    }))
}

/// `GET /api/chat/messages/{id}` — Single message by id.
///
/// # Errors
///
/// Returns [`ChatError::Unauthorized`] without a valid bearer token,
/// [`ChatError::MessageNotFound`] for an unknown, unparsable, or
/// soft-deleted id, or a [`ChatError`] when the store lookup fails.
#[utoipa::path(
    get,
    path = "/api/chat/messages/{id}",
    tag = "Chat",
    summary = "Single message",
    description = "Returns one visible message by id. Soft-deleted messages \
                   are treated as not found. Requires a bearer token.",
    params(
        ("id" = String, Path, description = "Message id"),
    ),
    responses(
        (status = 200, description = "The message", body = MessageResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "No visible message with that id"),
    )
)]
pub async fn message_handler(
    State(state): State<AppState>,
    RequireIdentity(_identity): RequireIdentity,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ChatError> {
    let msg = state.chat_service.message(&id).await?;
    Ok(Json(MessageResponse::from(&msg)))
}

/// `GET /api/chat/status` — Chat system status.
///
/// # Errors
///
/// Returns [`ChatError::Unauthorized`] without a valid bearer token, or
/// a [`ChatError`] when the store lookup fails.
#[utoipa::path(
    get,
    path = "/api/chat/status",
    tag = "Chat",
    summary = "Chat status",
    description = "Returns the live connection count and visible message total. \
                   Requires a bearer token.",
    responses(
        (status = 200, description = "Current chat status", body = ChatStatusResponse),
        (status = 401, description = "Missing or invalid bearer token"),
    )
)]
pub async fn status_handler(
    State(state): State<AppState>,
    RequireIdentity(_identity): RequireIdentity,
) -> Result<impl IntoResponse, ChatError> {
    let online_users = state
        .chat_service
        .broadcaster()
        .registry()
        .online_count()
        .await;
    let total_messages = state.chat_service.visible_message_count().await?;

    Ok(Json(ChatStatusResponse {
        online_users,
        total_messages,
        websocket_ready: true,
    }))
}

/// Chat routes mounted under `/api/chat`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/messages", get(history_handler))
        .route("/messages/{id}", get(message_handler))
        .route("/status", get(status_handler))
}
