//! PostgreSQL implementations of the message store and user directory.
//!
//! Expects these tables:
//!
//! ```sql
//! CREATE TABLE messages (
//!     id UUID PRIMARY KEY,
//!     sender_id TEXT NOT NULL,
//!     sender_name TEXT NOT NULL,
//!     content TEXT NOT NULL,
//!     room_id TEXT NOT NULL,
//!     message_type TEXT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
//!     reply_to_id TEXT,
//!     reply_to_username TEXT,
//!     reply_to_content TEXT
//! );
//!
//! CREATE TABLE users (
//!     email TEXT PRIMARY KEY,
//!     display_name TEXT,
//!     username TEXT,
//!     disabled BOOLEAN NOT NULL DEFAULT FALSE
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::MessageStore;
use crate::auth::{UserDirectory, UserRecord};
use crate::domain::{MessageId, MessageKind, NewMessage, ReplySnapshot, StoredMessage};
use crate::error::ChatError;

/// One `messages` row as fetched by sqlx.
type MessageRow = (
    Uuid,
    String,
    String,
    String,
    String,
    String,
    DateTime<Utc>,
    bool,
    Option<String>,
    Option<String>,
    Option<String>,
);

const SELECT_COLUMNS: &str = "id, sender_id, sender_name, content, room_id, message_type, \
     created_at, is_deleted, reply_to_id, reply_to_username, reply_to_content";

/// PostgreSQL-backed [`MessageStore`] using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_message(row: MessageRow) -> StoredMessage {
    let (
        id,
        sender_id,
        sender_name,
        content,
        room_id,
        _message_type,
        created_at,
        is_deleted,
        reply_to_id,
        reply_to_username,
        reply_to_content,
    ) = row;
    StoredMessage {
        id: MessageId::from_uuid(id),
        sender_id,
        sender_name,
        content,
        room_id,
        // Only one kind exists; the column is there for forward compatibility.
        kind: MessageKind::Text,
        created_at,
        is_deleted,
        reply: ReplySnapshot::from_parts(reply_to_id, reply_to_username, reply_to_content),
    }
}

fn store_err(err: sqlx::Error) -> ChatError {
    ChatError::Store(err.to_string())
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    async fn create(&self, new: NewMessage) -> Result<StoredMessage, ChatError> {
        let stored = StoredMessage::from_new(new);
        let (reply_id, reply_username, reply_content) = match &stored.reply {
            Some(reply) => (
                Some(reply.id.as_str()),
                reply.username.as_deref(),
                reply.content.as_deref(),
            ),
            None => (None, None, None),
        };

        sqlx::query(
            "INSERT INTO messages (id, sender_id, sender_name, content, room_id, message_type, \
             created_at, is_deleted, reply_to_id, reply_to_username, reply_to_content) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(stored.id.as_uuid())
        .bind(&stored.sender_id)
        .bind(&stored.sender_name)
        .bind(&stored.content)
        .bind(&stored.room_id)
        .bind(stored.kind.as_str())
        .bind(stored.created_at)
        .bind(stored.is_deleted)
        .bind(reply_id)
        .bind(reply_username)
        .bind(reply_content)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(stored)
    }

    async fn get(&self, id: MessageId) -> Result<Option<StoredMessage>, ChatError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(row_to_message))
    }

    async fn update_content(&self, id: MessageId, content: &str) -> Result<(), ChatError> {
        let result = sqlx::query("UPDATE messages SET content = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(content)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        if result.rows_affected() == 0 {
            return Err(ChatError::MessageNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn mark_deleted(&self, id: MessageId) -> Result<(), ChatError> {
        let result = sqlx::query("UPDATE messages SET is_deleted = TRUE WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        if result.rows_affected() == 0 {
            return Err(ChatError::MessageNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_page(
        &self,
        room_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<StoredMessage>, u64), ChatError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages WHERE room_id = $1 AND is_deleted = FALSE",
        )
        .bind(room_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        let offset = i64::from(page.max(1) - 1) * i64::from(page_size);
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM messages \
             WHERE room_id = $1 AND is_deleted = FALSE \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(room_id)
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let messages = rows.into_iter().map(row_to_message).collect();
        Ok((messages, total.max(0) as u64))
    }

    async fn count_visible(&self) -> Result<u64, ChatError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages WHERE is_deleted = FALSE",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(count.max(0) as u64)
    }
}

/// PostgreSQL-backed [`UserDirectory`] over the `users` table.
#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    /// Creates a directory over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find(&self, user_id: &str) -> Option<UserRecord> {
        let row = sqlx::query_as::<_, (String, Option<String>, Option<String>, bool)>(
            "SELECT email, display_name, username, disabled FROM users WHERE email = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;

        match row {
            Ok(row) => row.map(|(user_id, display_name, username, disabled)| UserRecord {
                user_id,
                display_name,
                username,
                disabled,
            }),
            Err(err) => {
                // A directory outage rejects admission; it must not panic
                // the connection task.
                tracing::error!(error = %err, "user directory lookup failed");
                None
            }
        }
    }
}
