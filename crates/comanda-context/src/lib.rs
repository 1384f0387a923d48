// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation assembly for Comanda.
//!
//! Builds the ordered turn sequence sent to the backend from two zones:
//! - **Static zone**: the domain-restriction system instruction
//! - **Dynamic zone**: stored history, optionally windowed
//!
//! followed by the new user turn. Assembly has no side effects; the caller
//! persists the new turn once the backend has answered.

pub mod dynamic;
pub mod static_zone;

use comanda_config::model::AgentConfig;
use comanda_core::{ChatTurn, ComandaError, ConversationStore};
use tracing::debug;

pub use dynamic::DynamicZone;
pub use static_zone::{StaticZone, domain_restriction_prompt};

/// Assembles system instruction, history and the new user turn.
#[derive(Debug, Clone)]
pub struct ConversationAssembler {
    static_zone: StaticZone,
    dynamic_zone: DynamicZone,
}

impl ConversationAssembler {
    pub async fn new(config: &AgentConfig) -> Self {
        Self {
            static_zone: StaticZone::new(config).await,
            dynamic_zone: DynamicZone::new(config.max_history_turns),
        }
    }

    pub fn with_zones(static_zone: StaticZone, dynamic_zone: DynamicZone) -> Self {
        Self {
            static_zone,
            dynamic_zone,
        }
    }

    pub fn system_prompt(&self) -> &str {
        self.static_zone.system_prompt()
    }

    /// `[system, ...history, user]`. Stored system turns are not re-emitted.
    pub fn assemble(&self, history: Vec<ChatTurn>, new_user_text: &str) -> Vec<ChatTurn> {
        let history = self.dynamic_zone.window(history);
        let mut turns = Vec::with_capacity(history.len() + 2);
        turns.push(self.static_zone.system_turn());
        turns.extend(history);
        turns.push(ChatTurn::user(new_user_text));
        turns
    }

    /// Load history from `store` and assemble.
    ///
    /// Any store failure surfaces as [`ComandaError::HistoryUnavailable`];
    /// history is never replaced by an empty list.
    pub async fn assemble_from(
        &self,
        store: &dyn ConversationStore,
        conversation_id: &str,
        new_user_text: &str,
    ) -> Result<Vec<ChatTurn>, ComandaError> {
        let history = store
            .list(conversation_id)
            .await
            .map_err(ComandaError::into_history)?;
        debug!(
            conversation_id,
            history_len = history.len(),
            "conversation history loaded"
        );
        Ok(self.assemble(history, new_user_text))
    }
}
