//! Chat message records as held by the message store.
//!
//! A [`StoredMessage`] is the durable form of a chat message. Identity
//! fields (`sender_id`, `sender_name`) are snapshots of the authenticated
//! session at send time and are never re-derived; the same goes for the
//! optional [`ReplySnapshot`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MessageId;

/// Room id used for every message while the gateway serves a single room.
pub const GLOBAL_ROOM: &str = "global";

/// Kind discriminator for stored messages.
///
/// Only `text` exists today; the field is stored so that system or media
/// messages can be added without a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text chat message.
    Text,
}

impl MessageKind {
    /// Returns the wire/storage string for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
        }
    }
}

/// Snapshot of the message a reply refers to, copied at reply-creation time.
///
/// Deliberately not a live reference: editing or soft-deleting the original
/// message leaves every reply's snapshot untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplySnapshot {
    /// Id of the referenced message, as the client supplied it.
    pub id: String,
    /// Display name of the referenced message's sender at reply time.
    pub username: Option<String>,
    /// Content of the referenced message at reply time.
    pub content: Option<String>,
}

impl ReplySnapshot {
    /// Assembles a snapshot from the three optional wire fields.
    ///
    /// A reply exists only when `reply_to_id` is present; the username and
    /// content fields ride along as-is.
    #[must_use]
    pub fn from_parts(
        id: Option<String>,
        username: Option<String>,
        content: Option<String>,
    ) -> Option<Self> {
        id.map(|id| Self {
            id,
            username,
            content,
        })
    }
}

/// Fields required to create a new message; the store assigns the rest.
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Authenticated sender id (from the session, never the payload).
    pub sender_id: String,
    /// Sender display name snapshot at send time.
    pub sender_name: String,
    /// Non-empty message body.
    pub content: String,
    /// Target room.
    pub room_id: String,
    /// Message kind.
    pub kind: MessageKind,
    /// Optional reply snapshot.
    pub reply: Option<ReplySnapshot>,
}

/// A durable chat message record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// Store-assigned identifier, immutable.
    pub id: MessageId,
    /// Authenticated sender id.
    pub sender_id: String,
    /// Sender display name snapshot at send time.
    pub sender_name: String,
    /// Message body; replaced wholesale by an edit.
    pub content: String,
    /// Room the message belongs to.
    pub room_id: String,
    /// Message kind.
    pub kind: MessageKind,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Soft-delete flag. Once set the record accepts no further edits.
    pub is_deleted: bool,
    /// Optional reply snapshot, fixed at creation.
    pub reply: Option<ReplySnapshot>,
}

impl StoredMessage {
    /// Builds the stored form of a [`NewMessage`] with a fresh id and the
    /// current server clock. Store implementations call this on create.
    #[must_use]
    pub fn from_new(new: NewMessage) -> Self {
        Self {
            id: MessageId::new(),
            sender_id: new.sender_id,
            sender_name: new.sender_name,
            content: new.content,
            room_id: new.room_id,
            kind: new.kind,
            created_at: Utc::now(),
            is_deleted: false,
            reply: new.reply,
        }
    }
}
