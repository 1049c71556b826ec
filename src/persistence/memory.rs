//! In-memory message store.
//!
//! Used when `PERSISTENCE_ENABLED=false` and throughout the test suite.
//! Same contract as the PostgreSQL store, minus durability.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::MessageStore;
use crate::domain::{MessageId, NewMessage, StoredMessage};
use crate::error::ChatError;

/// [`MessageStore`] held entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: RwLock<HashMap<MessageId, StoredMessage>>,
}

impl InMemoryMessageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create(&self, new: NewMessage) -> Result<StoredMessage, ChatError> {
        let stored = StoredMessage::from_new(new);
        let mut messages = self.messages.write().await;
        messages.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: MessageId) -> Result<Option<StoredMessage>, ChatError> {
        Ok(self.messages.read().await.get(&id).cloned())
    }

    async fn update_content(&self, id: MessageId, content: &str) -> Result<(), ChatError> {
        let mut messages = self.messages.write().await;
        let msg = messages
            .get_mut(&id)
            .ok_or_else(|| ChatError::MessageNotFound(id.to_string()))?;
        msg.content = content.to_string();
        Ok(())
    }

    async fn mark_deleted(&self, id: MessageId) -> Result<(), ChatError> {
        let mut messages = self.messages.write().await;
        let msg = messages
            .get_mut(&id)
            .ok_or_else(|| ChatError::MessageNotFound(id.to_string()))?;
        msg.is_deleted = true;
        Ok(())
    }

    async fn list_page(
        &self,
        room_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<StoredMessage>, u64), ChatError> {
        let messages = self.messages.read().await;
        let mut visible: Vec<StoredMessage> = messages
            .values()
            .filter(|m| m.room_id == room_id && !m.is_deleted)
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = visible.len() as u64;
        let skip = (page.max(1) as usize - 1).saturating_mul(page_size as usize);
        let page_items = visible
            .into_iter()
            .skip(skip)
            .take(page_size as usize)
            .collect();
        Ok((page_items, total))
    }

    async fn count_visible(&self) -> Result<u64, ChatError> {
        let messages = self.messages.read().await;
        Ok(messages.values().filter(|m| !m.is_deleted).count() as u64)
    }
}
