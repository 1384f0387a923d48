// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./comanda.toml` > `~/.config/comanda/comanda.toml` >
//! `/etc/comanda/comanda.toml` with environment variable overrides via the
//! `COMANDA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ComandaConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/comanda/comanda.toml` (system-wide)
/// 3. `~/.config/comanda/comanda.toml` (user XDG config)
/// 4. `./comanda.toml` (local directory)
/// 5. `COMANDA_*` environment variables
pub fn load_config() -> Result<ComandaConfig, figment::Error> {
    build_figment().extract().map(with_api_key_fallback)
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ComandaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ComandaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ComandaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ComandaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
        .map(with_api_key_fallback)
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ComandaConfig::default()))
        .merge(Toml::file("/etc/comanda/comanda.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("comanda/comanda.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("comanda.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")`: `COMANDA_OPENAI_API_KEY`
/// must map to `openai.api_key`, not `openai.api.key`.
fn env_provider() -> Env {
    Env::prefixed("COMANDA_").map(|key| {
        let mapped = key
            .as_str()
            .replacen("agent_", "agent.", 1)
            .replacen("openai_", "openai.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("pipeline_", "pipeline.", 1);
        mapped.into()
    })
}

/// Fill `openai.api_key` from the conventional `OPENAI_API_KEY` variable.
fn with_api_key_fallback(mut config: ComandaConfig) -> ComandaConfig {
    if config.openai.api_key.is_none() {
        config.openai.api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
    }
    config
}
