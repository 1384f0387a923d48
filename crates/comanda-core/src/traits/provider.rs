// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Language backend adapter trait.

use async_trait::async_trait;

use crate::error::ComandaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse};

/// Adapter for a chat-completion language backend.
///
/// Implementations send the assembled conversation plus the extraction
/// function declaration and report which shape the reply came back in.
/// Transport failures surface as [`ComandaError::BackendUnavailable`].
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ComandaError>;
}
