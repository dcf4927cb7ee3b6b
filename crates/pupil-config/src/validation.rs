// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation

use crate::{ConfigError, ConfigResult, PupilConfig};

/// Address schemes ZMQ can connect to
pub const SUPPORTED_SCHEMES: [&str; 3] = ["tcp://", "ipc://", "inproc://"];

/// Accepted values for `logging.level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// All problems are collected and reported together.
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` with details if validation fails
pub fn validate_config(config: &PupilConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// Every validation problem in `config`
pub fn collect_errors(config: &PupilConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    let remote = &config.remote;

    if remote.address.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "remote.address".to_string(),
        });
    } else if !SUPPORTED_SCHEMES.iter().any(|s| remote.address.starts_with(s)) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "remote.address".to_string(),
            reason: format!("must start with one of {}", SUPPORTED_SCHEMES.join(", ")),
        });
    }

    if remote.request_port == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "remote.request_port".to_string(),
            reason: "must be non-zero".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("'{}' is not one of {}", config.logging.level, LOG_LEVELS.join(", ")),
        });
    }

    errors
}
