//! Process-wide registry of live chat connections.
//!
//! [`ConnectionRegistry`] is the single piece of state shared across all
//! per-connection tasks, protected by a [`tokio::sync::RwLock`]. Every
//! registered connection owns a bounded outbound queue; `broadcast`
//! fans a payload into each queue and lazily prunes any connection whose
//! queue is closed or full.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::RwLock;
use tokio::sync::mpsc;

/// Unique handle for one live connection.
///
/// Distinct from any user id: the same user may hold several connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry-side record of one live connection.
#[derive(Debug)]
struct ConnectionHandle {
    /// Authenticated user id, fixed at admission.
    user_id: String,
    /// Outbound queue feeding the connection's write half.
    tx: mpsc::Sender<String>,
}

/// Live set of all registered connections.
///
/// # Concurrency
///
/// - `register`/`unregister` take the write lock briefly; `broadcast`
///   snapshots the set under the read lock and sends outside it.
/// - A connection disconnecting concurrently with a broadcast is safe:
///   its queue send fails and the same pass removes it.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
    /// Capacity of each per-connection outbound queue.
    outbound_capacity: usize,
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("outbound_capacity", &self.outbound_capacity)
            .finish_non_exhaustive()
    }
}

impl ConnectionRegistry {
    /// Creates an empty registry whose per-connection outbound queues hold
    /// up to `outbound_capacity` pending payloads.
    #[must_use]
    pub fn new(outbound_capacity: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            outbound_capacity: outbound_capacity.max(1),
        }
    }

    /// Adds a connection for the given authenticated user.
    ///
    /// Returns the new connection's id and the receiving end of its
    /// outbound queue. Never fails.
    pub async fn register(&self, user_id: &str) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.outbound_capacity);
        let handle = ConnectionHandle {
            user_id: user_id.to_string(),
            tx,
        };
        let mut map = self.connections.write().await;
        map.insert(id, handle);
        tracing::info!(connection = %id, user_id, total = map.len(), "connection registered");
        (id, rx)
    }

    /// Removes a connection if present. Idempotent: the receive loop's
    /// cleanup path and a broadcast-failure prune may both call this.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let mut map = self.connections.write().await;
        if let Some(handle) = map.remove(&id) {
            tracing::info!(
                connection = %id,
                user_id = %handle.user_id,
                total = map.len(),
                "connection unregistered"
            );
            true
        } else {
            false
        }
    }

    /// Delivers `payload` to every connection registered at call time.
    ///
    /// Sends go through each connection's bounded queue via `try_send`:
    /// a closed queue (the peer's task exited) or a full queue (a stalled
    /// client) counts as a dead link and is unregistered in the same pass.
    /// One failing connection never blocks delivery to the rest.
    ///
    /// Returns the number of connections the payload was queued for.
    pub async fn broadcast(&self, payload: &str) -> usize {
        let snapshot: Vec<(ConnectionId, mpsc::Sender<String>)> = {
            let map = self.connections.read().await;
            map.iter()
                .map(|(id, handle)| (*id, handle.tx.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, tx) in snapshot {
            match tx.try_send(payload.to_string()) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::warn!(connection = %id, error = %err, "broadcast send failed, pruning");
                    dead.push(id);
                }
            }
        }

        for id in dead {
            self.unregister(id).await;
        }

        delivered
    }

    /// Returns the number of live connections.
    pub async fn online_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no connection is registered.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}
