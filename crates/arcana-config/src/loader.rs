// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./arcana.toml` > `~/.config/arcana/arcana.toml`
//! with environment variable overrides via the `ARCANA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ArcanaConfig;

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `~/.config/arcana/arcana.toml` (user XDG config)
/// 3. `./arcana.toml` (local directory)
/// 4. `ARCANA_*` environment variables
pub fn load_config() -> Result<ArcanaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ArcanaConfig::default()))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("arcana/arcana.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("arcana.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<ArcanaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ArcanaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ArcanaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ArcanaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `ARCANA_OPENAI_API_KEY` must map to
/// `openai.api_key`, not `openai.api.key`.
fn env_provider() -> Env {
    Env::prefixed("ARCANA_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("bot_", "bot.", 1)
            .replacen("payments_", "payments.", 1)
            .replacen("openai_", "openai.", 1)
            .replacen("limits_", "limits.", 1)
            .replacen("pacing_", "pacing.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("log_", "log.", 1);
        mapped.into()
    })
}
