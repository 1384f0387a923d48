// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One user turn, end to end.
//!
//! Assemble the conversation, call the backend with the extraction function,
//! interpret the reply, persist the turn pair, and resolve the order against
//! the catalog. Turns of one conversation run one at a time.

use std::sync::Arc;
use std::time::Duration;

use comanda_config::model::ComandaConfig;
use comanda_context::ConversationAssembler;
use comanda_core::{
    CatalogProduct, CatalogStore, ChatTurn, ComandaError, ConversationStore, ExtractedOrder,
    ProviderAdapter, ProviderRequest, ProviderResponse,
};
use comanda_extract::{TemporalContext, extraction_function, interpret};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::matcher::{CatalogMatcher, ItemMatch, first_match};

/// Backend attempts per turn when the first one fails transiently.
const MAX_BACKEND_ATTEMPTS: u32 = 2;

/// Tunables for [`OrderPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub model: String,
    pub max_tokens: u32,
    pub backend_timeout: Duration,
    pub catalog_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &ComandaConfig) -> Self {
        Self {
            model: config.openai.default_model.clone(),
            max_tokens: config.openai.max_tokens,
            backend_timeout: Duration::from_secs(config.pipeline.backend_timeout_secs),
            catalog_timeout: Duration::from_secs(config.pipeline.catalog_timeout_secs),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&ComandaConfig::default())
    }
}

/// The result of a completed turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    pub conversation_id: String,
    pub order: ExtractedOrder,
    /// The product for the first line item with a catalog hit.
    pub matched: Option<CatalogProduct>,
    pub item_matches: Vec<ItemMatch>,
    /// The backend's prose when it did not return an extraction.
    pub assistant_text: Option<String>,
    pub issues: Vec<String>,
}

/// Orchestrates extraction turns over the configured collaborators.
pub struct OrderPipeline {
    provider: Arc<dyn ProviderAdapter>,
    conversations: Arc<dyn ConversationStore>,
    matcher: CatalogMatcher,
    assembler: ConversationAssembler,
    settings: PipelineSettings,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl OrderPipeline {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        conversations: Arc<dyn ConversationStore>,
        catalog: Arc<dyn CatalogStore>,
        assembler: ConversationAssembler,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            provider,
            conversations,
            matcher: CatalogMatcher::new(catalog, settings.catalog_timeout),
            assembler,
            settings,
            locks: DashMap::new(),
        }
    }

    pub fn matcher(&self) -> &CatalogMatcher {
        &self.matcher
    }

    /// Conversations with a turn currently running or queued.
    pub fn tracked_conversations(&self) -> usize {
        self.locks.len()
    }

    async fn lock_conversation(&self, conversation_id: &str) -> ConversationLock<'_> {
        let mutex = self
            .locks
            .entry(conversation_id.to_string())
            .or_default()
            .clone();
        let guard = mutex.lock_owned().await;
        ConversationLock {
            locks: &self.locks,
            conversation_id: conversation_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Run a turn against the current wall clock.
    ///
    /// A missing `conversation_id` starts a new conversation.
    pub async fn handle_turn(
        &self,
        conversation_id: Option<&str>,
        text: &str,
    ) -> Result<TurnOutcome, ComandaError> {
        self.handle_turn_at(TemporalContext::capture(), conversation_id, text)
            .await
    }

    /// Run a turn with an explicit reference instant.
    pub async fn handle_turn_at(
        &self,
        ctx: TemporalContext,
        conversation_id: Option<&str>,
        text: &str,
    ) -> Result<TurnOutcome, ComandaError> {
        if text.trim().is_empty() {
            return Err(ComandaError::InvalidInput(
                "message content must not be empty".to_string(),
            ));
        }

        let conversation_id = match conversation_id {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        };

        let _lock = self.lock_conversation(&conversation_id).await;

        let messages = self
            .assembler
            .assemble_from(self.conversations.as_ref(), &conversation_id, text)
            .await?;

        let request = ProviderRequest {
            model: self.settings.model.clone(),
            messages,
            function: Some(extraction_function(&ctx)),
            max_tokens: self.settings.max_tokens,
        };

        let response = self.call_backend(&conversation_id, request).await?;
        let interpretation = interpret(&response.reply, &ctx);

        // The pair is written only once the backend has answered.
        self.conversations
            .append_pair(
                &conversation_id,
                &ChatTurn::user(text),
                &ChatTurn::assistant(interpretation.payload.clone()),
            )
            .await
            .map_err(ComandaError::into_history)?;

        let item_matches = self
            .matcher
            .match_items(&interpretation.order.items)
            .await?;
        let matched = first_match(&item_matches).into_product();

        info!(
            conversation_id = conversation_id.as_str(),
            model = response.model.as_str(),
            items = interpretation.order.items.len(),
            date = %interpretation.order.date,
            time = interpretation.order.time.as_str(),
            matched_id = matched.as_ref().map(|p| p.id),
            issues = interpretation.issues.len(),
            "turn completed"
        );

        Ok(TurnOutcome {
            conversation_id,
            order: interpretation.order,
            matched,
            item_matches,
            assistant_text: interpretation.assistant_text,
            issues: interpretation.issues,
        })
    }

    /// Call the backend under the turn timeout, retrying a transient failure once.
    async fn call_backend(
        &self,
        conversation_id: &str,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, ComandaError> {
        let timeout = self.settings.backend_timeout;
        let mut attempt = 1;
        loop {
            debug!(conversation_id, attempt, "calling backend");
            let result = match tokio::time::timeout(timeout, self.provider.complete(request.clone()))
                .await
            {
                Ok(result) => result,
                Err(_elapsed) => Err(ComandaError::Timeout { duration: timeout }),
            };

            match result {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < MAX_BACKEND_ATTEMPTS => {
                    warn!(conversation_id, attempt, error = %e, "backend call failed, retrying");
                    attempt += 1;
                }
                Err(ComandaError::Timeout { duration }) => {
                    warn!(conversation_id, attempt, "backend timed out, giving up");
                    return Err(ComandaError::BackendUnavailable {
                        message: format!("no reply within {duration:?} after {attempt} attempts"),
                        source: None,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Holds a conversation's turn lock and drops the map entry once no other
/// turn is waiting on it.
struct ConversationLock<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    conversation_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ConversationLock<'_> {
    fn drop(&mut self) {
        // Release first so the guard's reference to the mutex is gone.
        drop(self.guard.take());
        self.locks
            .remove_if(&self.conversation_id, |_, mutex| {
                Arc::strong_count(mutex) == 1
            });
    }
}
