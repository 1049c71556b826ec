//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::IdentityResolver;
use crate::service::ChatService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Chat service for all message operations and broadcast fan-out.
    pub chat_service: Arc<ChatService>,
    /// Resolver gating admission to the chat channel.
    pub identity_resolver: Arc<dyn IdentityResolver>,
}
