//! Outbound events broadcast to every live connection.
//!
//! Every successful dispatch emits a [`ChatEvent`] through the
//! [`super::Broadcaster`]. The serialized shape is the wire contract:
//! a single JSON object per frame with a `type` discriminator.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::message::StoredMessage;

/// Event fanned out to all registered connections after a mutation
/// has been persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A new message was posted.
    Message {
        /// Store-assigned message id.
        id: String,
        /// Sender display name (admission-time snapshot).
        username: String,
        /// Authenticated sender id.
        sender_id: String,
        /// Message body.
        message: String,
        /// Server-side creation timestamp (ISO-8601).
        timestamp: DateTime<Utc>,
        /// Id of the replied-to message, when this is a reply.
        #[serde(skip_serializing_if = "Option::is_none")]
        reply_to_id: Option<String>,
        /// Replied-to sender name snapshot.
        #[serde(skip_serializing_if = "Option::is_none")]
        reply_to_username: Option<String>,
        /// Replied-to content snapshot.
        #[serde(skip_serializing_if = "Option::is_none")]
        reply_to_content: Option<String>,
    },

    /// An existing message's content was replaced by its sender.
    Edit {
        /// Id of the edited message.
        id: String,
        /// The new content.
        message: String,
    },

    /// A message was soft-deleted by its sender.
    Delete {
        /// Id of the deleted message.
        id: String,
    },
}

impl ChatEvent {
    /// Builds the `message` broadcast for a freshly persisted record.
    #[must_use]
    pub fn from_stored(msg: &StoredMessage) -> Self {
        let (reply_to_id, reply_to_username, reply_to_content) = match &msg.reply {
            Some(reply) => (
                Some(reply.id.clone()),
                reply.username.clone(),
                reply.content.clone(),
            ),
            None => (None, None, None),
        };
        Self::Message {
            id: msg.id.to_string(),
            username: msg.sender_name.clone(),
            sender_id: msg.sender_id.clone(),
            message: msg.content.clone(),
            timestamp: msg.created_at,
            reply_to_id,
            reply_to_username,
            reply_to_content,
        }
    }
}
