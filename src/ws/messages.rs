//! Inbound WebSocket event schema.
//!
//! Clients send one JSON object per frame with a `type` discriminator.
//! Anything that fails to decode — unknown type, missing fields, invalid
//! JSON — is discarded without a reply; the connection stays open.

use serde::Deserialize;

/// Events a client can send over the chat channel.
///
/// Sender identity is never part of the payload; it always comes from the
/// admission-time session identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Post a new message, optionally replying to another one.
    Message {
        /// Message body.
        message: String,
        /// Id of the message being replied to.
        #[serde(default)]
        reply_to_id: Option<String>,
        /// Display name snapshot of the replied-to sender.
        #[serde(default)]
        reply_to_username: Option<String>,
        /// Content snapshot of the replied-to message.
        #[serde(default)]
        reply_to_content: Option<String>,
    },
    /// Replace the content of an own message.
    Edit {
        /// Target message id.
        id: String,
        /// New content.
        message: String,
    },
    /// Soft-delete an own message.
    Delete {
        /// Target message id.
        id: String,
    },
}
