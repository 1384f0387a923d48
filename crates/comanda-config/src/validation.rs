// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Collects every violation instead of failing on the first one.

use crate::diagnostic::ConfigError;
use crate::model::ComandaConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &ComandaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        fail(format!(
            "agent.log_level `{}` must be one of {}",
            config.agent.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.agent.service_domain.trim().is_empty() {
        fail("agent.service_domain must not be empty".to_string());
    }

    if config.agent.max_history_turns == Some(0) {
        fail("agent.max_history_turns must be at least 1 when set".to_string());
    }

    if config.openai.base_url.trim().is_empty() {
        fail("openai.base_url must not be empty".to_string());
    } else if !(config.openai.base_url.starts_with("http://")
        || config.openai.base_url.starts_with("https://"))
    {
        fail(format!(
            "openai.base_url `{}` must start with http:// or https://",
            config.openai.base_url
        ));
    }

    if config.openai.request_timeout_secs == 0 {
        fail("openai.request_timeout_secs must be greater than 0".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.gateway.port == 0 {
        fail("gateway.port must not be 0".to_string());
    }

    if config.pipeline.backend_timeout_secs == 0 {
        fail("pipeline.backend_timeout_secs must be greater than 0".to_string());
    }

    if config.pipeline.catalog_timeout_secs == 0 {
        fail("pipeline.catalog_timeout_secs must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
