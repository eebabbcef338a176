// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Arcana tarot bot.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), file hierarchy lookup, and environment variable
//! overrides.
//!
//! # Usage
//!
//! ```no_run
//! let config = arcana_config::load_and_validate().expect("config errors");
//! println!("model: {}", config.openai.model);
//! ```

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::ArcanaConfig;
pub use validation::{ConfigError, validate_config};

/// Load configuration from the file hierarchy and validate it.
///
/// This is the high-level entry point used by the binary: Figment load,
/// then the post-deserialization validation pass. Figment errors are
/// folded into the same `ConfigError` list as validation failures.
pub fn load_and_validate() -> Result<ArcanaConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(err
            .into_iter()
            .map(|e| ConfigError {
                message: e.to_string(),
            })
            .collect()),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<ArcanaConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(err
            .into_iter()
            .map(|e| ConfigError {
                message: e.to_string(),
            })
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_toml_loads_and_validates() {
        let config = load_and_validate_str(
            r#"
[bot]
token = "123:abc"

[payments]
premium_price = 25
"#,
        )
        .unwrap();
        assert_eq!(config.payments.premium_price, 25);
    }

    #[test]
    fn validation_failures_surface_as_errors() {
        let errors = load_and_validate_str(
            r#"
[openai]
temperature = 9.0
"#,
        )
        .unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("temperature")));
    }

    #[test]
    fn figment_errors_surface_as_errors() {
        let errors = load_and_validate_str("limits = 3").unwrap_err();
        assert!(!errors.is_empty());
    }
}
