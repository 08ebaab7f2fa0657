// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as positive budgets and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::KindredConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &KindredConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.memory.top_k == 0 {
        errors.push(ConfigError::Validation {
            message: "memory.top_k must be at least 1".to_string(),
        });
    }

    if config.prompt.max_prompt_chars == 0 {
        errors.push(ConfigError::Validation {
            message: "prompt.max_prompt_chars must be positive".to_string(),
        });
    }

    if config.engine.temperature < 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.temperature must be non-negative, got {}",
                config.engine.temperature
            ),
        });
    }

    if config.engine.max_tokens == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.max_tokens must be at least 1".to_string(),
        });
    }

    if config.engine.workers == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.workers must be at least 1".to_string(),
        });
    }

    if config.engine.context_window == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.context_window must be positive".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = KindredConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails() {
        let mut config = KindredConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn zero_top_k_fails() {
        let mut config = KindredConfig::default();
        config.memory.top_k = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("top_k"))));
    }

    #[test]
    fn negative_temperature_fails() {
        let mut config = KindredConfig::default();
        config.engine.temperature = -0.1;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("temperature"))));
    }

    #[test]
    fn multiple_errors_collected() {
        let mut config = KindredConfig::default();
        config.memory.top_k = 0;
        config.engine.workers = 0;
        config.prompt.max_prompt_chars = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3, "validation must not fail fast");
    }
}
