//! DTOs for the read-only chat REST endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::StoredMessage;

/// One message in a history response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Message id.
    pub id: String,
    /// Sender id.
    pub sender_id: String,
    /// Sender display name snapshot at send time.
    pub sender_name: String,
    /// Message body.
    pub content: String,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Room the message belongs to.
    pub room_id: String,
    /// Message kind (`"text"`).
    pub message_type: String,
    /// Replied-to message id, when this is a reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    /// Replied-to sender name snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_username: Option<String>,
    /// Replied-to content snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_content: Option<String>,
}

impl From<&StoredMessage> for MessageResponse {
    fn from(msg: &StoredMessage) -> Self {
        let (reply_to_id, reply_to_username, reply_to_content) = match &msg.reply {
            Some(reply) => (
                Some(reply.id.clone()),
                reply.username.clone(),
                reply.content.clone(),
            ),
            None => (None, None, None),
        };
        Self {
            id: msg.id.to_string(),
            sender_id: msg.sender_id.clone(),
            sender_name: msg.sender_name.clone(),
            content: msg.content.clone(),
            timestamp: msg.created_at,
            room_id: msg.room_id.clone(),
            message_type: msg.kind.as_str().to_string(),
            reply_to_id,
            reply_to_username,
            reply_to_content,
        }
    }
}

/// Paginated history response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageListResponse {
    /// Messages on this page, newest first.
    pub messages: Vec<MessageResponse>,
    /// Total number of visible messages in the room.
    pub total_count: u64,
    /// Current page (1-indexed).
    pub page: u32,
    /// Messages per page.
    pub page_size: u32,
    /// Whether more pages exist after this one.
    pub has_more: bool,
}

/// Query parameters for the history endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryParams {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Messages per page (max 100). Defaults to 20.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

impl HistoryParams {
    /// Clamps the parameters to their allowed ranges.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, 100),
        }
    }
}

/// Chat system status.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatStatusResponse {
    /// Number of live WebSocket connections.
    pub online_users: usize,
    /// Number of visible (non-deleted) messages.
    pub total_messages: u64,
    /// Whether the real-time channel is available.
    pub websocket_ready: bool,
}
