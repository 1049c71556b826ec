//! Axum WebSocket upgrade handler.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use super::connection::run_connection;
use crate::app_state::AppState;

/// Connection-time parameters for the chat channel.
#[derive(Debug, Deserialize)]
pub struct ChannelParams {
    /// Bearer credential. A missing token is rejected after the upgrade
    /// with an `auth_required` close frame.
    pub token: Option<String>,
}

/// `GET /ws/chat` — Upgrade to the real-time chat channel.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ChannelParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_connection(socket, params.token, state))
}
