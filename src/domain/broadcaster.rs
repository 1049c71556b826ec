//! Broadcast coordination between dispatch and the connection registry.
//!
//! [`Broadcaster`] serializes a [`ChatEvent`] to its stable JSON wire form
//! and fans it out through the [`ConnectionRegistry`]. Callers only invoke
//! it after the corresponding store write has succeeded, which fixes the
//! persist-then-broadcast order.

use std::sync::Arc;

use super::ChatEvent;
use super::registry::ConnectionRegistry;

/// Serializing front-end to [`ConnectionRegistry::broadcast`].
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    /// Creates a broadcaster over the given registry.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the underlying registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Serializes `event` and delivers it to every live connection.
    ///
    /// Returns the number of connections the event was queued for.
    /// Serialization of a [`ChatEvent`] cannot fail in practice; if it
    /// ever does the event is dropped and logged rather than poisoning
    /// the sender's receive loop.
    pub async fn publish(&self, event: &ChatEvent) -> usize {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize chat event");
                return 0;
            }
        };
        self.registry.broadcast(&json).await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_fans_out_serialized_event() {
        let registry = Arc::new(ConnectionRegistry::new(8));
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        let (_id, mut rx) = registry.register("alice").await;

        let delivered = broadcaster
            .publish(&ChatEvent::Delete {
                id: "m1".to_string(),
            })
            .await;
        assert_eq!(delivered, 1);

        let frame = rx.recv().await;
        let Some(frame) = frame else {
            panic!("expected a frame");
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&frame) else {
            panic!("frame is not valid JSON");
        };
        assert_eq!(value["type"], "delete");
        assert_eq!(value["id"], "m1");
    }

    #[tokio::test]
    async fn publish_with_no_connections_delivers_zero() {
        let registry = Arc::new(ConnectionRegistry::new(8));
        let broadcaster = Broadcaster::new(registry);
        let delivered = broadcaster
            .publish(&ChatEvent::Delete {
                id: "m1".to_string(),
            })
            .await;
        assert_eq!(delivered, 0);
    }
}
