//! Domain layer: message model, connection registry, and broadcast fan-out.
//!
//! This module contains the server-side domain model: message identity and
//! records, the outbound event schema, the process-wide registry of live
//! connections, and the broadcaster that fans events out to them.

pub mod broadcaster;
pub mod chat_event;
pub mod message;
pub mod message_id;
pub mod registry;

pub use broadcaster::Broadcaster;
pub use chat_event::ChatEvent;
pub use message::{GLOBAL_ROOM, MessageKind, NewMessage, ReplySnapshot, StoredMessage};
pub use message_id::MessageId;
pub use registry::{ConnectionId, ConnectionRegistry};
