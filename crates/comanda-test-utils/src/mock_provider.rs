// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock language backend for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with a scripted FIFO of
//! replies, enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use comanda_core::{
    AdapterType, BackendReply, ComandaError, FunctionCall, HealthStatus, PluginAdapter,
    ProviderAdapter, ProviderRequest, ProviderResponse, TokenUsage,
};

struct Scripted {
    delay: Option<Duration>,
    result: Result<BackendReply, ComandaError>,
}

/// A mock backend that answers from a scripted queue.
///
/// When the queue is empty, a plain "mock response" content reply is
/// returned.
pub struct MockProvider {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ProviderRequest>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Pre-load the given replies.
    pub fn with_replies(replies: Vec<BackendReply>) -> Self {
        replies.into_iter().fold(Self::new(), Self::then_reply)
    }

    pub fn then_reply(mut self, reply: BackendReply) -> Self {
        self.script.get_mut().push_back(Scripted {
            delay: None,
            result: Ok(reply),
        });
        self
    }

    /// Queue a function-call reply for the extraction function.
    pub fn then_extraction(self, arguments: serde_json::Value) -> Self {
        self.then_reply(extraction_call(arguments))
    }

    /// Queue a reply that is only delivered after `delay`.
    pub fn then_delayed(mut self, delay: Duration, reply: BackendReply) -> Self {
        self.script.get_mut().push_back(Scripted {
            delay: Some(delay),
            result: Ok(reply),
        });
        self
    }

    pub fn then_error(mut self, error: ComandaError) -> Self {
        self.script.get_mut().push_back(Scripted {
            delay: None,
            result: Err(error),
        });
        self
    }

    /// Append a reply to a provider that is already shared.
    pub async fn add_reply(&self, reply: BackendReply) {
        self.script.lock().await.push_back(Scripted {
            delay: None,
            result: Ok(reply),
        });
    }

    /// Number of `complete` calls received, including ones that timed out.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, in order.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    async fn next(&self) -> Scripted {
        self.script.lock().await.pop_front().unwrap_or(Scripted {
            delay: None,
            result: Ok(BackendReply::Content("mock response".to_string())),
        })
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// A function-call reply carrying `arguments` for the extraction function.
pub fn extraction_call(arguments: serde_json::Value) -> BackendReply {
    BackendReply::FunctionCall(FunctionCall {
        name: "getProductsAndDate".to_string(),
        arguments: arguments.to_string(),
    })
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
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
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ComandaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let model = request.model.clone();
        self.requests.lock().await.push(request);

        let scripted = self.next().await;
        if let Some(delay) = scripted.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = scripted.result?;

        Ok(ProviderResponse {
            id: format!("mock-resp-{}", uuid::Uuid::new_v4()),
            model,
            reply,
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
            },
        })
    }
}
