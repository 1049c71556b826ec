//! Message store: durable CRUD for chat message records.
//!
//! The gateway treats the store as an externally synchronized collaborator:
//! single-record reads and writes are atomic, concurrent edits to the same
//! id are last-write-wins, and no locking happens above this seam.

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;

use crate::domain::{MessageId, NewMessage, StoredMessage};
use crate::error::ChatError;

pub use memory::InMemoryMessageStore;
pub use postgres::{PostgresMessageStore, PostgresUserDirectory};

/// Durable append/lookup/update of message records, keyed by [`MessageId`].
#[async_trait]
pub trait MessageStore: Send + Sync + fmt::Debug {
    /// Persists a new message; the store assigns id and creation timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Store`] on a persistence failure.
    async fn create(&self, new: NewMessage) -> Result<StoredMessage, ChatError>;

    /// Looks a message up by id. `Ok(None)` means no such record, which
    /// includes ids that never existed.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Store`] on a persistence failure.
    async fn get(&self, id: MessageId) -> Result<Option<StoredMessage>, ChatError>;

    /// Replaces a message's content.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::MessageNotFound`] if the id is unknown, or
    /// [`ChatError::Store`] on a persistence failure.
    async fn update_content(&self, id: MessageId, content: &str) -> Result<(), ChatError>;

    /// Sets a message's soft-delete flag. The record is never physically
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::MessageNotFound`] if the id is unknown, or
    /// [`ChatError::Store`] on a persistence failure.
    async fn mark_deleted(&self, id: MessageId) -> Result<(), ChatError>;

    /// Returns one page of non-deleted messages in `room_id`, newest first,
    /// along with the total count of matching messages. `page` is 1-indexed.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Store`] on a persistence failure.
    async fn list_page(
        &self,
        room_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<StoredMessage>, u64), ChatError>;

    /// Returns the number of non-deleted messages across all rooms.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Store`] on a persistence failure.
    async fn count_visible(&self) -> Result<u64, ChatError>;
}
