//! # chat-gateway
//!
//! WebSocket and REST gateway for a real-time global chat room.
//!
//! Clients connect to `/ws/chat` with a bearer token, post, edit, and
//! soft-delete messages, and every other live connection sees the events
//! fanned out in real time. Credential issuance and the message store's
//! durability are collaborators behind trait seams; this crate is the
//! connection registry, the per-connection protocol state machine, and
//! the broadcast coordinator.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── WS Handler (ws/)          — admission, receive loop
//!     ├── REST Handlers (api/)      — history, status, health
//!     │
//!     ├── ChatService (service/)    — persist-then-broadcast dispatch
//!     │
//!     ├── ConnectionRegistry (domain/)
//!     ├── Broadcaster (domain/)
//!     │
//!     ├── IdentityResolver (auth/)  — HS256 JWT + user directory
//!     └── MessageStore (persistence/) — PostgreSQL or in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
