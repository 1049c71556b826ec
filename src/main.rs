//! chat-gateway server entry point.
//!
//! Starts the Axum HTTP server with the WebSocket chat channel and the
//! read-only REST endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chat_gateway::api;
use chat_gateway::app_state::AppState;
use chat_gateway::auth::{InMemoryUserDirectory, JwtIdentityResolver, UserDirectory};
use chat_gateway::config::ChatConfig;
use chat_gateway::domain::{Broadcaster, ConnectionRegistry};
use chat_gateway::persistence::{
    InMemoryMessageStore, MessageStore, PostgresMessageStore, PostgresUserDirectory,
};
use chat_gateway::service::ChatService;
use chat_gateway::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ChatConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting chat-gateway");

    // Message store and user directory: PostgreSQL when persistence is
    // enabled, process memory otherwise.
    let (store, directory): (Arc<dyn MessageStore>, Arc<dyn UserDirectory>) =
        if config.persistence_enabled {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .min_connections(config.database_min_connections)
                .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
                .connect(&config.database_url)
                .await?;
            tracing::info!("connected to postgres");
            (
                Arc::new(PostgresMessageStore::new(pool.clone())),
                Arc::new(PostgresUserDirectory::new(pool)),
            )
        } else {
            tracing::warn!("persistence disabled, messages and accounts live in memory only");
            let directory = InMemoryUserDirectory::new();
            directory.seed_from_list(&config.dev_users).await;
            (
                Arc::new(InMemoryMessageStore::new()),
                Arc::new(directory),
            )
        };

    // Admission: HS256 tokens over the user directory.
    let identity_resolver = Arc::new(JwtIdentityResolver::new(&config.jwt_secret, directory));

    // Domain layer
    let registry = Arc::new(ConnectionRegistry::new(config.outbound_queue_capacity));
    let broadcaster = Broadcaster::new(registry);

    // Service layer
    let chat_service = Arc::new(ChatService::new(store, broadcaster));

    // Build application state
    let app_state = AppState {
        chat_service,
        identity_resolver,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws/chat", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
