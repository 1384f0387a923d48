// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Chat Completions API.
//!
//! Handles authentication, request timeouts and retry of transient
//! statuses (429, 500, 502, 503) and dropped connections.

use std::time::Duration;

use comanda_core::ComandaError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse};

const COMPLETIONS_PATH: &str = "/chat/completions";

/// HTTP client for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    retry_delay: Duration,
    request_timeout: Duration,
}

impl OpenAiClient {
    /// # Arguments
    /// * `api_key` - bearer token
    /// * `base_url` - API root such as `https://api.openai.com/v1`
    /// * `request_timeout` - per-request HTTP timeout
    pub fn new(
        api_key: &str,
        base_url: &str,
        request_timeout: Duration,
    ) -> Result<Self, ComandaError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| ComandaError::Config(format!("invalid API key header value: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ComandaError::BackendUnavailable {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}{COMPLETIONS_PATH}", base_url.trim_end_matches('/')),
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
            request_timeout,
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends a completion request, retrying transient statuses and
    /// connection failures.
    ///
    /// A request that exceeds the HTTP timeout fails with
    /// [`ComandaError::Timeout`] so the caller can decide whether to retry.
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ComandaError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying completion request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = match self.client.post(&self.endpoint).json(request).send().await {
                Ok(response) => response,
                Err(e) if !e.is_timeout() && attempt < self.max_retries => {
                    warn!(error = %e, attempt, "transport error, will retry");
                    last_error = Some(self.transport_error(e));
                    continue;
                }
                Err(e) => return Err(self.transport_error(e)),
            };

            let status = response.status();
            debug!(status = %status, attempt, "completion response received");

            if status.is_success() {
                let body = response
                    .text()
                    .await
                    .map_err(|e| self.transport_error(e))?;
                return serde_json::from_str(&body).map_err(|e| {
                    ComandaError::BackendUnavailable {
                        message: format!("failed to parse API response: {e}"),
                        source: Some(Box::new(e)),
                    }
                });
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(ComandaError::BackendUnavailable {
                    message: format!("API returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!(
                    "OpenAI API error ({}): {}",
                    api_err.error.type_.as_deref().unwrap_or("unknown"),
                    api_err.error.message
                ),
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(ComandaError::BackendUnavailable {
                message,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| ComandaError::BackendUnavailable {
            message: "completion request failed after retries".into(),
            source: None,
        }))
    }

    fn transport_error(&self, e: reqwest::Error) -> ComandaError {
        if e.is_timeout() {
            return ComandaError::Timeout {
                duration: self.request_timeout,
            };
        }
        ComandaError::BackendUnavailable {
            message: format!("HTTP request failed: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

/// HTTP statuses worth one more attempt.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}
