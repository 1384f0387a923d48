// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `comanda serve` and `comanda extract`.

use std::sync::Arc;

use comanda_agent::{OrderPipeline, PipelineSettings};
use comanda_config::ComandaConfig;
use comanda_context::ConversationAssembler;
use comanda_core::{ComandaError, PluginAdapter};
use comanda_gateway::{GatewayState, ServerConfig};
use comanda_openai::OpenAiProvider;
use comanda_storage::SqliteStorage;
use tracing::{info, warn};

/// Open storage and wire the pipeline to the configured backend.
async fn build_pipeline(
    config: &ComandaConfig,
) -> Result<(Arc<OrderPipeline>, Arc<SqliteStorage>), ComandaError> {
    let storage = Arc::new(SqliteStorage::open(config.storage.clone()).await?);
    let provider = Arc::new(OpenAiProvider::new(&config.openai)?);
    let assembler = ConversationAssembler::new(&config.agent).await;

    let pipeline = OrderPipeline::new(
        provider,
        storage.clone(),
        storage.clone(),
        assembler,
        PipelineSettings::from_config(config),
    );
    Ok((Arc::new(pipeline), storage))
}

pub async fn run_serve(config: ComandaConfig) -> Result<(), ComandaError> {
    let (pipeline, storage) = build_pipeline(&config).await?;
    let state = GatewayState::new(pipeline, storage.clone(), storage.clone());
    let server = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };

    info!(agent = config.agent.name.as_str(), "comanda serve starting");
    comanda_gateway::start_server(&server, state, shutdown_signal()).await?;

    if let Err(e) = storage.shutdown().await {
        warn!(error = %e, "storage shutdown failed");
    }
    info!("comanda serve shutdown complete");
    Ok(())
}

pub async fn run_extract(
    config: ComandaConfig,
    text: &str,
    conversation_id: Option<&str>,
) -> Result<(), ComandaError> {
    let (pipeline, storage) = build_pipeline(&config).await?;
    let outcome = pipeline.handle_turn(conversation_id, text).await?;
    let json = serde_json::to_string_pretty(&outcome)
        .map_err(|e| ComandaError::Internal(format!("failed to render outcome: {e}")))?;
    println!("{json}");
    storage.shutdown().await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
