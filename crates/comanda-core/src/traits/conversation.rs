// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation history store.

use async_trait::async_trait;

use crate::error::ComandaError;
use crate::types::{ChatTurn, ConversationSummary};

/// Ordered, append-only storage of prior turns keyed by conversation id.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Appends one turn to the end of the conversation, creating the
    /// conversation on first use.
    async fn append(&self, conversation_id: &str, turn: &ChatTurn) -> Result<(), ComandaError>;

    /// Appends a user turn and its reply atomically: either both are
    /// stored or neither is.
    async fn append_pair(
        &self,
        conversation_id: &str,
        user: &ChatTurn,
        assistant: &ChatTurn,
    ) -> Result<(), ComandaError>;

    /// Returns every stored turn of the conversation, oldest first.
    ///
    /// An unknown conversation yields an empty list.
    async fn list(&self, conversation_id: &str) -> Result<Vec<ChatTurn>, ComandaError>;

    /// Returns all known conversations, most recently active first.
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ComandaError>;
}
