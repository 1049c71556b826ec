//! REST API layer: route handlers, DTOs, and router composition.
//!
//! The REST surface is read-only; all mutation happens over the
//! WebSocket channel. The chat endpoints require the same bearer
//! credential as WebSocket admission.

pub mod dto;
pub mod extract;
pub mod handlers;

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document assembled from the handler annotations.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::chat::history_handler,
        handlers::chat::message_handler,
        handlers::chat::status_handler,
        handlers::system::health_handler,
    ),
    components(schemas(
        dto::MessageResponse,
        dto::MessageListResponse,
        dto::ChatStatusResponse,
        handlers::system::HealthResponse,
    )),
    tags(
        (name = "Chat", description = "Message history and channel status"),
        (name = "System", description = "Service health"),
    )
)]
struct ApiDoc;

async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/chat", handlers::chat::routes())
        .merge(handlers::system::routes())
        .route("/api-docs/openapi.json", get(openapi_handler))
}
