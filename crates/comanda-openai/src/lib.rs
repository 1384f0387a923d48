// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible backend adapter for Comanda.
//!
//! Implements [`ProviderAdapter`] over the Chat Completions API. The
//! extraction function is offered as a single forced tool; the reply is
//! tagged as content, function call, or both.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use comanda_config::model::OpenAiConfig;
use comanda_core::{
    AdapterType, BackendReply, ComandaError, FunctionCall, HealthStatus, PluginAdapter,
    ProviderAdapter, ProviderRequest, ProviderResponse, TokenUsage,
};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{
    ApiFunctionDefinition, ApiMessage, ApiTool, ChatCompletionRequest, ChatCompletionResponse,
};

/// Chat Completions backend implementing [`ProviderAdapter`].
///
/// API key resolution order: config, then the `OPENAI_API_KEY` environment
/// variable, then a configuration error.
pub struct OpenAiProvider {
    client: OpenAiClient,
    default_model: String,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig) -> Result<Self, ComandaError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = OpenAiClient::new(
            &api_key,
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs),
        )?
        .with_max_retries(config.max_retries);

        info!(
            model = config.default_model,
            endpoint = client.endpoint(),
            "OpenAI provider initialized"
        );

        Ok(Self {
            client,
            default_model: config.default_model.clone(),
        })
    }

    pub fn with_client(client: OpenAiClient, default_model: impl Into<String>) -> Self {
        Self {
            client,
            default_model: default_model.into(),
        }
    }

    fn to_api_request(&self, request: &ProviderRequest) -> ChatCompletionRequest {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        let messages = request
            .messages
            .iter()
            .map(|turn| ApiMessage {
                role: turn.role.to_string(),
                content: turn.content.clone(),
            })
            .collect();

        let (tools, tool_choice) = match &request.function {
            Some(function) => (
                Some(vec![ApiTool {
                    type_: "function".to_string(),
                    function: ApiFunctionDefinition {
                        name: function.name.clone(),
                        description: function.description.clone(),
                        parameters: function.parameters.clone(),
                    },
                }]),
                Some(serde_json::json!({
                    "type": "function",
                    "function": {"name": function.name}
                })),
            ),
            None => (None, None),
        };

        ChatCompletionRequest {
            model,
            messages,
            tools,
            tool_choice,
            max_tokens: request.max_tokens,
        }
    }
}

fn resolve_api_key(configured: &Option<String>) -> Result<String, ComandaError> {
    if let Some(key) = configured.as_deref().filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }
    std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            ComandaError::Config(
                "no OpenAI API key: set openai.api_key or OPENAI_API_KEY".to_string(),
            )
        })
}

/// Map the first choice to a tagged reply.
fn to_provider_response(response: ChatCompletionResponse) -> Result<ProviderResponse, ComandaError> {
    let usage = response
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ComandaError::BackendUnavailable {
            message: "response contained no choices".to_string(),
            source: None,
        })?;

    let message = choice.message;
    let call = message
        .tool_calls
        .and_then(|calls| calls.into_iter().next())
        .map(|tc| tc.function)
        .or(message.function_call)
        .map(|f| FunctionCall {
            name: f.name,
            arguments: f.arguments,
        });

    debug!(
        finish_reason = choice.finish_reason.as_deref().unwrap_or(""),
        has_content = message.content.as_deref().is_some_and(|c| !c.is_empty()),
        has_call = call.is_some(),
        "backend reply shape"
    );

    Ok(ProviderResponse {
        id: response.id,
        model: response.model,
        reply: BackendReply::from_parts(message.content, call),
        usage,
    })
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ComandaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ComandaError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ComandaError> {
        let api_request = self.to_api_request(&request);
        debug!(
            model = api_request.model,
            messages = api_request.messages.len(),
            "sending completion request"
        );
        let response = self.client.complete(&api_request).await?;
        to_provider_response(response)
    }
}
