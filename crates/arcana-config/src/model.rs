// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Arcana tarot bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Arcana configuration.
///
/// Loaded from `arcana.toml` with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArcanaConfig {
    /// Telegram bot settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// In-chat payment settings.
    #[serde(default)]
    pub payments: PaymentsConfig,

    /// Text-generation API settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Free-tier usage limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Reveal-sequence pacing delays.
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Flat-file storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Telegram bot settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Telegram Bot API token. Required to serve; `None` only fails at startup.
    #[serde(default)]
    pub token: Option<String>,

    /// User IDs exempt from payment and the free-tier limit.
    #[serde(default)]
    pub allow_list: Vec<i64>,
}

/// In-chat payment settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentsConfig {
    /// ISO currency code; `XTR` is Telegram Stars.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Premium reading price in the currency's native unit.
    #[serde(default = "default_premium_price")]
    pub premium_price: u32,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            premium_price: default_premium_price(),
        }
    }
}

fn default_currency() -> String {
    "XTR".to_string()
}

fn default_premium_price() -> u32 {
    50
}

/// Text-generation API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. `None` requires the environment variable override.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier for reading generation.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens per generated response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature, 0.0..=2.0.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Chat-completions endpoint; overridable for tests.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            base_url: default_base_url(),
        }
    }
}

fn default_model() -> String {
    "gpt-4-turbo".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_base_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

/// Free-tier usage limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Test readings allowed per user before the paywall.
    #[serde(default = "default_free_test_limit")]
    pub free_test_limit: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            free_test_limit: default_free_test_limit(),
        }
    }
}

fn default_free_test_limit() -> u32 {
    3
}

/// Reveal-sequence pacing delays, in milliseconds.
///
/// These are cooperative sleeps between outgoing messages; they never hold
/// a lock.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PacingConfig {
    #[serde(default = "default_pacing_short_ms")]
    pub short_ms: u64,

    #[serde(default = "default_pacing_medium_ms")]
    pub medium_ms: u64,

    #[serde(default = "default_pacing_long_ms")]
    pub long_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            short_ms: default_pacing_short_ms(),
            medium_ms: default_pacing_medium_ms(),
            long_ms: default_pacing_long_ms(),
        }
    }
}

fn default_pacing_short_ms() -> u64 {
    500
}

fn default_pacing_medium_ms() -> u64 {
    1000
}

fn default_pacing_long_ms() -> u64 {
    2000
}

/// Flat-file storage settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding `users.json` and `readings.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
