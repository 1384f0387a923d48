// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static zone: the single leading system instruction.

use comanda_config::model::AgentConfig;
use comanda_core::ChatTurn;
use tracing::info;

/// Holds the system prompt that restricts the assistant to its service domain.
#[derive(Debug, Clone)]
pub struct StaticZone {
    system_prompt: String,
}

impl StaticZone {
    /// Load the system prompt from config.
    ///
    /// # Priority
    /// 1. `config.system_prompt_file`, read from disk
    /// 2. `config.system_prompt`, inline
    /// 3. The built-in domain restriction for `config.service_domain`
    pub async fn new(config: &AgentConfig) -> Self {
        Self {
            system_prompt: load_system_prompt(config).await,
        }
    }

    pub fn from_prompt(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn system_turn(&self) -> ChatTurn {
        ChatTurn::system(self.system_prompt.clone())
    }
}

/// The built-in instruction: stay on the service domain, decline the rest.
pub fn domain_restriction_prompt(name: &str, service_domain: &str) -> String {
    format!(
        "You are {name}, an assistant that only handles {service_domain}. \
         Extract the products the user wants and when they will pick them up. \
         If the user asks about anything unrelated to {service_domain}, politely \
         decline and explain that you can only help with {service_domain}."
    )
}

async fn load_system_prompt(config: &AgentConfig) -> String {
    if let Some(ref file_path) = config.system_prompt_file {
        match tokio::fs::read_to_string(file_path).await {
            Ok(content) => {
                let trimmed = content.trim().to_string();
                if !trimmed.is_empty() {
                    info!(path = file_path.as_str(), "loaded system prompt from file");
                    return trimmed;
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = file_path.as_str(),
                    error = %e,
                    "failed to read system prompt file, falling back"
                );
            }
        }
    }

    if let Some(ref prompt) = config.system_prompt
        && !prompt.trim().is_empty()
    {
        return prompt.clone();
    }

    domain_restriction_prompt(&config.name, &config.service_domain)
}
