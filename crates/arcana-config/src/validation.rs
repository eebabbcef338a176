// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as value ranges and non-empty identifiers.

use thiserror::Error;

use crate::model::ArcanaConfig;

/// A single configuration validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration: {message}")]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ArcanaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.payments.currency.trim().is_empty() {
        errors.push(ConfigError::new("payments.currency must not be empty"));
    }

    if config.payments.premium_price == 0 {
        errors.push(ConfigError::new(
            "payments.premium_price must be at least 1",
        ));
    }

    if config.openai.model.trim().is_empty() {
        errors.push(ConfigError::new("openai.model must not be empty"));
    }

    if config.openai.max_tokens == 0 {
        errors.push(ConfigError::new("openai.max_tokens must be at least 1"));
    }

    if !(0.0..=2.0).contains(&config.openai.temperature) {
        errors.push(ConfigError::new(format!(
            "openai.temperature must be within 0.0..=2.0, got {}",
            config.openai.temperature
        )));
    }

    if config.openai.base_url.trim().is_empty() {
        errors.push(ConfigError::new("openai.base_url must not be empty"));
    }

    if config.storage.data_dir.trim().is_empty() {
        errors.push(ConfigError::new("storage.data_dir must not be empty"));
    }

    if !LOG_LEVELS.contains(&config.log.level.as_str()) {
        errors.push(ConfigError::new(format!(
            "log.level must be one of {LOG_LEVELS:?}, got `{}`",
            config.log.level
        )));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
