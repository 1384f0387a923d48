// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use comanda_agent::OrderPipeline;
use comanda_core::{CatalogStore, ComandaError, ConversationStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: Arc<OrderPipeline>,
    pub conversations: Arc<dyn ConversationStore>,
    pub catalog: Arc<dyn CatalogStore>,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

impl GatewayState {
    pub fn new(
        pipeline: Arc<OrderPipeline>,
        conversations: Arc<dyn ConversationStore>,
        catalog: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            pipeline,
            conversations,
            catalog,
            start_time: std::time::Instant::now(),
        }
    }
}

/// Gateway server configuration (mirrors `GatewayConfig` from comanda-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the application router.
///
/// - POST /v1/messages
/// - GET /v1/conversations, GET /v1/conversations/{id}/messages
/// - GET, POST /v1/products
/// - GET, PUT, DELETE /v1/products/{id}
/// - GET /health
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/v1/messages", post(handlers::post_messages))
        .route("/v1/conversations", get(handlers::get_conversations))
        .route(
            "/v1/conversations/{id}/messages",
            get(handlers::get_conversation_messages),
        )
        .route(
            "/v1/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/v1/products/{id}",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ComandaError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ComandaError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ComandaError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
