// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use comanda_agent::TurnOutcome;
use comanda_core::{
    CatalogProduct, ChatTurn, ComandaError, ConversationSummary, ErrorKind, NewProduct,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::server::GatewayState;

/// Request body for POST /v1/messages.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub content: String,
    /// Continue an existing conversation; omitted starts a new one.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub conversation_id: String,
    pub messages: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<CatalogProduct>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: ErrorKind,
}

/// Pipeline and store failures rendered as JSON.
pub struct ApiError(pub ComandaError);

impl From<ComandaError> for ApiError {
    fn from(err: ComandaError) -> Self {
        Self(err)
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::HistoryUnavailable
        | ErrorKind::CatalogUnavailable
        | ErrorKind::MalformedExtraction
        | ErrorKind::Storage
        | ErrorKind::Config
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            warn!(kind = %kind, error = %self.0, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                kind,
            }),
        )
            .into_response()
    }
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// POST /v1/messages
///
/// Runs one extraction turn and returns the outcome.
pub async fn post_messages(
    State(state): State<GatewayState>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
    let outcome = state
        .pipeline
        .handle_turn(body.conversation_id.as_deref(), &body.content)
        .await?;
    Ok(Json(outcome))
}

/// GET /v1/conversations
pub async fn get_conversations(
    State(state): State<GatewayState>,
) -> Result<Json<ConversationListResponse>, ApiError> {
    let conversations = state
        .conversations
        .list_conversations()
        .await
        .map_err(ComandaError::into_history)?;
    Ok(Json(ConversationListResponse { conversations }))
}

/// GET /v1/conversations/{id}/messages
pub async fn get_conversation_messages(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<MessageListResponse>, ApiError> {
    let messages = state
        .conversations
        .list(&id)
        .await
        .map_err(ComandaError::into_history)?;
    Ok(Json(MessageListResponse {
        conversation_id: id,
        messages,
    }))
}

/// GET /v1/products
pub async fn list_products(
    State(state): State<GatewayState>,
) -> Result<Json<ProductListResponse>, ApiError> {
    let products = state.catalog.list().await?;
    Ok(Json(ProductListResponse { products }))
}

/// POST /v1/products
pub async fn create_product(
    State(state): State<GatewayState>,
    Json(body): Json<NewProduct>,
) -> Result<(StatusCode, Json<CatalogProduct>), ApiError> {
    let product = state.catalog.create(&body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /v1/products/{id}
pub async fn get_product(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> Result<Json<CatalogProduct>, ApiError> {
    state
        .catalog
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| product_not_found(id))
}

/// PUT /v1/products/{id}
pub async fn update_product(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    Json(body): Json<NewProduct>,
) -> Result<Json<CatalogProduct>, ApiError> {
    Ok(Json(state.catalog.update(id, &body).await?))
}

/// DELETE /v1/products/{id}
pub async fn delete_product(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn product_not_found(id: i64) -> ApiError {
    ApiError(ComandaError::NotFound {
        entity: "product".to_string(),
        id: id.to_string(),
    })
}
