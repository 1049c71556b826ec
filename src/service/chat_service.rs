//! Chat service: orchestrates message operations and broadcast fan-out.
//!
//! Every mutation follows the same order: validate → persist → broadcast.
//! A store failure aborts the dispatch before any broadcast, so unpersisted
//! content is never fanned out. Authorization and existence failures on
//! edit/delete are deliberate silent no-ops: the protocol has no per-request
//! acknowledgment frame, and an unauthorized client must not learn whether
//! a message id exists or who owns it.

use std::sync::Arc;

use crate::auth::Identity;
use crate::domain::{
    Broadcaster, ChatEvent, GLOBAL_ROOM, MessageId, MessageKind, NewMessage, ReplySnapshot,
    StoredMessage,
};
use crate::error::ChatError;
use crate::persistence::MessageStore;

/// Internal outcome of an edit/delete attempt. Never surfaced to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The mutation was persisted and broadcast.
    Applied,
    /// Silently ignored: unknown id, deleted message, or foreign sender.
    Ignored,
}

/// Orchestration layer for all chat operations.
///
/// Stateless coordinator over the [`MessageStore`] and the [`Broadcaster`].
/// Identity fields always come from the admission-time [`Identity`], never
/// from client-supplied payload fields.
#[derive(Debug, Clone)]
pub struct ChatService {
    store: Arc<dyn MessageStore>,
    broadcaster: Broadcaster,
}

impl ChatService {
    /// Creates a new `ChatService`.
    #[must_use]
    pub fn new(store: Arc<dyn MessageStore>, broadcaster: Broadcaster) -> Self {
        Self { store, broadcaster }
    }

    /// Returns the inner [`Broadcaster`].
    #[must_use]
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Persists and broadcasts a new message from `identity`.
    ///
    /// Empty content is silently ignored (`Ok(None)`), matching the
    /// no-acknowledgment wire contract. The reply triple, when present,
    /// is snapshotted as-is and never re-derived.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Store`] when persistence fails; nothing is
    /// broadcast in that case.
    pub async fn post_message(
        &self,
        identity: &Identity,
        content: &str,
        reply: Option<ReplySnapshot>,
    ) -> Result<Option<StoredMessage>, ChatError> {
        if content.is_empty() {
            return Ok(None);
        }

        let stored = self
            .store
            .create(NewMessage {
                sender_id: identity.user_id.clone(),
                sender_name: identity.display_name.clone(),
                content: content.to_string(),
                room_id: GLOBAL_ROOM.to_string(),
                kind: MessageKind::Text,
                reply,
            })
            .await?;

        let delivered = self.broadcaster.publish(&ChatEvent::from_stored(&stored)).await;
        tracing::info!(id = %stored.id, sender_id = %identity.user_id, delivered, "message posted");
        Ok(Some(stored))
    }

    /// Replaces the content of a message owned by `identity`.
    ///
    /// Silent no-op when the id does not parse, the message is unknown or
    /// soft-deleted, or the session identity is not the sender.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Store`] when persistence fails; nothing is
    /// broadcast in that case.
    pub async fn edit_message(
        &self,
        identity: &Identity,
        id: &str,
        content: &str,
    ) -> Result<DispatchOutcome, ChatError> {
        if content.is_empty() {
            return Ok(DispatchOutcome::Ignored);
        }
        let Some(msg) = self.fetch_owned(identity, id).await? else {
            return Ok(DispatchOutcome::Ignored);
        };

        self.store.update_content(msg.id, content).await?;
        let delivered = self
            .broadcaster
            .publish(&ChatEvent::Edit {
                id: msg.id.to_string(),
                message: content.to_string(),
            })
            .await;
        tracing::info!(id = %msg.id, sender_id = %identity.user_id, delivered, "message edited");
        Ok(DispatchOutcome::Applied)
    }

    /// Soft-deletes a message owned by `identity`.
    ///
    /// Silent no-op under the same conditions as an edit; an already
    /// deleted message is immutable, so deleting it twice is also a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Store`] when persistence fails; nothing is
    /// broadcast in that case.
    pub async fn delete_message(
        &self,
        identity: &Identity,
        id: &str,
    ) -> Result<DispatchOutcome, ChatError> {
        let Some(msg) = self.fetch_owned(identity, id).await? else {
            return Ok(DispatchOutcome::Ignored);
        };

        self.store.mark_deleted(msg.id).await?;
        let delivered = self
            .broadcaster
            .publish(&ChatEvent::Delete {
                id: msg.id.to_string(),
            })
            .await;
        tracing::info!(id = %msg.id, sender_id = %identity.user_id, delivered, "message deleted");
        Ok(DispatchOutcome::Applied)
    }

    /// Returns one page of the room's visible history, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Store`] when the store lookup fails.
    pub async fn history(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<StoredMessage>, u64), ChatError> {
        self.store.list_page(GLOBAL_ROOM, page, page_size).await
    }

    /// Returns a single visible message by its client-supplied id string.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::MessageNotFound`] when the id does not parse,
    /// no such record exists, or the message is soft-deleted, and
    /// [`ChatError::Store`] when the lookup fails.
    pub async fn message(&self, id: &str) -> Result<StoredMessage, ChatError> {
        let parsed =
            MessageId::parse(id).ok_or_else(|| ChatError::MessageNotFound(id.to_string()))?;
        let msg = self
            .store
            .get(parsed)
            .await?
            .ok_or_else(|| ChatError::MessageNotFound(id.to_string()))?;
        if msg.is_deleted {
            return Err(ChatError::MessageNotFound(id.to_string()));
        }
        Ok(msg)
    }

    /// Returns the number of visible (non-deleted) messages.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Store`] when the store lookup fails.
    pub async fn visible_message_count(&self) -> Result<u64, ChatError> {
        self.store.count_visible().await
    }

    /// Fetches the message behind a client-supplied id string if it exists,
    /// is not deleted, and is owned by `identity`.
    async fn fetch_owned(
        &self,
        identity: &Identity,
        id: &str,
    ) -> Result<Option<StoredMessage>, ChatError> {
        let Some(id) = MessageId::parse(id) else {
            tracing::debug!(raw_id = id, "ignoring mutation with unparsable id");
            return Ok(None);
        };
        let Some(msg) = self.store.get(id).await? else {
            tracing::debug!(%id, "ignoring mutation of unknown message");
            return Ok(None);
        };
        if msg.is_deleted {
            tracing::debug!(%id, "ignoring mutation of deleted message");
            return Ok(None);
        }
        if msg.sender_id != identity.user_id {
            tracing::debug!(%id, requester = %identity.user_id, "ignoring mutation by non-sender");
            return Ok(None);
        }
        Ok(Some(msg))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::ConnectionRegistry;
    use crate::persistence::InMemoryMessageStore;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    fn identity(user_id: &str, name: &str) -> Identity {
        Identity {
            user_id: user_id.to_string(),
            display_name: name.to_string(),
        }
    }

    struct Harness {
        service: ChatService,
        registry: Arc<ConnectionRegistry>,
        store: Arc<InMemoryMessageStore>,
    }

    fn harness() -> Harness {
        let registry = Arc::new(ConnectionRegistry::new(16));
        let store = Arc::new(InMemoryMessageStore::new());
        let service = ChatService::new(
            Arc::clone(&store) as Arc<dyn MessageStore>,
            Broadcaster::new(Arc::clone(&registry)),
        );
        Harness {
            service,
            registry,
            store,
        }
    }

    async fn recv_json(rx: &mut mpsc::Receiver<String>) -> serde_json::Value {
        let Ok(Some(frame)) =
            tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv()).await
        else {
            panic!("expected a broadcast frame");
        };
        let Ok(value) = serde_json::from_str(&frame) else {
            panic!("frame is not valid JSON");
        };
        value
    }

    #[tokio::test]
    async fn post_broadcasts_to_every_connection() {
        let h = harness();
        let (_a, mut rx_a) = h.registry.register("x@example.com").await;
        let (_b, mut rx_b) = h.registry.register("y@example.com").await;

        let x = identity("x@example.com", "X");
        let Ok(Some(stored)) = h.service.post_message(&x, "hi", None).await else {
            panic!("post failed");
        };

        for rx in [&mut rx_a, &mut rx_b] {
            let json = recv_json(rx).await;
            assert_eq!(json["type"], "message");
            assert_eq!(json["id"], stored.id.to_string());
            assert_eq!(json["username"], "X");
            assert_eq!(json["sender_id"], "x@example.com");
            assert_eq!(json["message"], "hi");
        }
        // Exactly once each
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_content_is_silently_ignored() {
        let h = harness();
        let (_a, mut rx) = h.registry.register("x@example.com").await;

        let x = identity("x@example.com", "X");
        let result = h.service.post_message(&x, "", None).await;
        assert!(matches!(result, Ok(None)));
        assert!(rx.try_recv().is_err());
        assert_eq!(h.store.count_visible().await.ok(), Some(0));
    }

    #[tokio::test]
    async fn foreign_edit_changes_nothing_and_broadcasts_nothing() {
        let h = harness();
        let x = identity("x@example.com", "X");
        let y = identity("y@example.com", "Y");

        let Ok(Some(stored)) = h.service.post_message(&x, "hi", None).await else {
            panic!("post failed");
        };
        let (_c, mut rx) = h.registry.register("y@example.com").await;

        let outcome = h
            .service
            .edit_message(&y, &stored.id.to_string(), "hacked")
            .await;
        assert_eq!(outcome.ok(), Some(DispatchOutcome::Ignored));
        assert!(rx.try_recv().is_err());

        let current = h.store.get(stored.id).await.ok().flatten();
        assert_eq!(current.map(|m| m.content), Some("hi".to_string()));
    }

    #[tokio::test]
    async fn edit_by_sender_updates_and_broadcasts() {
        let h = harness();
        let x = identity("x@example.com", "X");

        let Ok(Some(stored)) = h.service.post_message(&x, "hi", None).await else {
            panic!("post failed");
        };
        let (_c, mut rx) = h.registry.register("x@example.com").await;

        let outcome = h
            .service
            .edit_message(&x, &stored.id.to_string(), "hi there")
            .await;
        assert_eq!(outcome.ok(), Some(DispatchOutcome::Applied));

        let json = recv_json(&mut rx).await;
        assert_eq!(json["type"], "edit");
        assert_eq!(json["id"], stored.id.to_string());
        assert_eq!(json["message"], "hi there");
    }

    #[tokio::test]
    async fn edit_after_delete_is_a_no_op() {
        let h = harness();
        let x = identity("x@example.com", "X");

        let Ok(Some(stored)) = h.service.post_message(&x, "hi", None).await else {
            panic!("post failed");
        };
        let deleted = h.service.delete_message(&x, &stored.id.to_string()).await;
        assert_eq!(deleted.ok(), Some(DispatchOutcome::Applied));

        let outcome = h
            .service
            .edit_message(&x, &stored.id.to_string(), "resurrected")
            .await;
        assert_eq!(outcome.ok(), Some(DispatchOutcome::Ignored));

        let current = h.store.get(stored.id).await.ok().flatten();
        let Some(current) = current else {
            panic!("record vanished");
        };
        assert_eq!(current.content, "hi");
        assert!(current.is_deleted);
    }

    #[tokio::test]
    async fn second_delete_is_a_no_op() {
        let h = harness();
        let x = identity("x@example.com", "X");

        let Ok(Some(stored)) = h.service.post_message(&x, "hi", None).await else {
            panic!("post failed");
        };
        assert_eq!(
            h.service
                .delete_message(&x, &stored.id.to_string())
                .await
                .ok(),
            Some(DispatchOutcome::Applied)
        );
        assert_eq!(
            h.service
                .delete_message(&x, &stored.id.to_string())
                .await
                .ok(),
            Some(DispatchOutcome::Ignored)
        );
    }

    #[tokio::test]
    async fn foreign_delete_leaves_message_visible() {
        let h = harness();
        let x = identity("x@example.com", "X");
        let y = identity("y@example.com", "Y");

        let Ok(Some(stored)) = h.service.post_message(&x, "hi", None).await else {
            panic!("post failed");
        };
        let (_c, mut rx) = h.registry.register("x@example.com").await;

        let outcome = h.service.delete_message(&y, &stored.id.to_string()).await;
        assert_eq!(outcome.ok(), Some(DispatchOutcome::Ignored));
        assert!(rx.try_recv().is_err());

        let current = h.store.get(stored.id).await.ok().flatten();
        assert_eq!(current.map(|m| m.is_deleted), Some(false));
    }

    #[tokio::test]
    async fn unparsable_id_is_ignored() {
        let h = harness();
        let x = identity("x@example.com", "X");
        let outcome = h.service.edit_message(&x, "not-a-uuid", "x").await;
        assert_eq!(outcome.ok(), Some(DispatchOutcome::Ignored));
    }

    #[tokio::test]
    async fn reply_snapshot_survives_edit_and_delete_of_original() {
        let h = harness();
        let x = identity("x@example.com", "X");
        let y = identity("y@example.com", "Y");

        let Ok(Some(original)) = h.service.post_message(&x, "original text", None).await else {
            panic!("post failed");
        };
        let reply = ReplySnapshot {
            id: original.id.to_string(),
            username: Some("X".to_string()),
            content: Some("original text".to_string()),
        };
        let Ok(Some(reply_msg)) = h.service.post_message(&y, "agreed", Some(reply)).await else {
            panic!("reply post failed");
        };

        let Ok(DispatchOutcome::Applied) = h
            .service
            .edit_message(&x, &original.id.to_string(), "changed")
            .await
        else {
            panic!("edit failed");
        };
        let Ok(DispatchOutcome::Applied) =
            h.service.delete_message(&x, &original.id.to_string()).await
        else {
            panic!("delete failed");
        };

        let current = h.store.get(reply_msg.id).await.ok().flatten();
        let Some(current) = current else {
            panic!("reply vanished");
        };
        let Some(snapshot) = current.reply else {
            panic!("snapshot missing");
        };
        assert_eq!(snapshot.content.as_deref(), Some("original text"));
        assert_eq!(snapshot.username.as_deref(), Some("X"));
    }

    #[tokio::test]
    async fn single_message_lookup_excludes_deleted_and_unknown() {
        let h = harness();
        let x = identity("x@example.com", "X");

        let Ok(Some(stored)) = h.service.post_message(&x, "hi", None).await else {
            panic!("post failed");
        };
        let found = h.service.message(&stored.id.to_string()).await;
        assert_eq!(found.ok().map(|m| m.content), Some("hi".to_string()));

        assert!(matches!(
            h.service.message("not-a-uuid").await,
            Err(ChatError::MessageNotFound(_))
        ));
        assert!(matches!(
            h.service.message(&MessageId::new().to_string()).await,
            Err(ChatError::MessageNotFound(_))
        ));

        let Ok(DispatchOutcome::Applied) =
            h.service.delete_message(&x, &stored.id.to_string()).await
        else {
            panic!("delete failed");
        };
        assert!(matches!(
            h.service.message(&stored.id.to_string()).await,
            Err(ChatError::MessageNotFound(_))
        ));
    }

    /// Store that fails every write, for the persist-before-broadcast rule.
    #[derive(Debug)]
    struct FailingStore;

    #[async_trait]
    impl MessageStore for FailingStore {
        async fn create(&self, _new: NewMessage) -> Result<StoredMessage, ChatError> {
            Err(ChatError::Store("disk on fire".to_string()))
        }
        async fn get(&self, _id: MessageId) -> Result<Option<StoredMessage>, ChatError> {
            Err(ChatError::Store("disk on fire".to_string()))
        }
        async fn update_content(&self, _id: MessageId, _content: &str) -> Result<(), ChatError> {
            Err(ChatError::Store("disk on fire".to_string()))
        }
        async fn mark_deleted(&self, _id: MessageId) -> Result<(), ChatError> {
            Err(ChatError::Store("disk on fire".to_string()))
        }
        async fn list_page(
            &self,
            _room_id: &str,
            _page: u32,
            _page_size: u32,
        ) -> Result<(Vec<StoredMessage>, u64), ChatError> {
            Err(ChatError::Store("disk on fire".to_string()))
        }
        async fn count_visible(&self) -> Result<u64, ChatError> {
            Err(ChatError::Store("disk on fire".to_string()))
        }
    }

    #[tokio::test]
    async fn store_failure_prevents_broadcast() {
        let registry = Arc::new(ConnectionRegistry::new(16));
        let service = ChatService::new(
            Arc::new(FailingStore),
            Broadcaster::new(Arc::clone(&registry)),
        );
        let (_c, mut rx) = registry.register("x@example.com").await;

        let x = identity("x@example.com", "X");
        let result = service.post_message(&x, "hi", None).await;
        assert!(matches!(result, Err(ChatError::Store(_))));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn scenario_message_edit_then_foreign_delete() {
        let h = harness();
        let x = identity("x@example.com", "X");
        let y = identity("y@example.com", "Y");

        let (_cx, mut rx_x) = h.registry.register("x@example.com").await;
        let (_cy, mut rx_y) = h.registry.register("y@example.com").await;

        // X posts
        let Ok(Some(m1)) = h.service.post_message(&x, "hi", None).await else {
            panic!("post failed");
        };
        for rx in [&mut rx_x, &mut rx_y] {
            let json = recv_json(rx).await;
            assert_eq!(json["type"], "message");
            assert_eq!(json["username"], "X");
            assert_eq!(json["message"], "hi");
        }

        // X edits
        let Ok(DispatchOutcome::Applied) = h
            .service
            .edit_message(&x, &m1.id.to_string(), "hi there")
            .await
        else {
            panic!("edit failed");
        };
        for rx in [&mut rx_x, &mut rx_y] {
            let json = recv_json(rx).await;
            assert_eq!(json["type"], "edit");
            assert_eq!(json["id"], m1.id.to_string());
            assert_eq!(json["message"], "hi there");
        }

        // Y (not the sender) tries to delete: nothing happens
        let Ok(DispatchOutcome::Ignored) =
            h.service.delete_message(&y, &m1.id.to_string()).await
        else {
            panic!("expected ignored");
        };
        assert!(rx_x.try_recv().is_err());
        assert!(rx_y.try_recv().is_err());
        let current = h.store.get(m1.id).await.ok().flatten();
        assert_eq!(current.map(|m| m.is_deleted), Some(false));
    }
}
