//! WebSocket layer: the real-time chat channel.
//!
//! The endpoint at `/ws/chat` is the single mutation path of the gateway:
//! admission-gated, one task per connection, events fanned out to every
//! live peer.

pub mod connection;
pub mod handler;
pub mod messages;
