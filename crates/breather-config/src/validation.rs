//! Configuration validation

use crate::schema::RawConfig;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("poll_interval_ms must be at least {min} (got {value})")]
    PollIntervalTooShort { value: u64, min: u64 },

    #[error("{field} cannot be empty")]
    EmptyPath { field: &'static str },
}

/// Shortest accepted foreground poll period
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let lifecycle = &config.lifecycle;
    if lifecycle.allowance_seconds == Some(0) {
        errors.push(ValidationError::ZeroDuration {
            field: "allowance_seconds",
        });
    }
    if lifecycle.block_seconds == Some(0) {
        errors.push(ValidationError::ZeroDuration {
            field: "block_seconds",
        });
    }
    if lifecycle.usage_threshold_minutes == Some(0) {
        errors.push(ValidationError::ZeroDuration {
            field: "usage_threshold_minutes",
        });
    }
    if let Some(value) = lifecycle.poll_interval_ms
        && value < MIN_POLL_INTERVAL_MS
    {
        errors.push(ValidationError::PollIntervalTooShort {
            value,
            min: MIN_POLL_INTERVAL_MS,
        });
    }

    let service = &config.service;
    let paths = [
        ("data_dir", &service.data_dir),
        ("shield_path", &service.shield_path),
        ("schedule_path", &service.schedule_path),
    ];
    for (field, path) in paths {
        if path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            errors.push(ValidationError::EmptyPath { field });
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawLifecycleConfig, RawServiceConfig};
    use std::path::PathBuf;

    fn config(lifecycle: RawLifecycleConfig, service: RawServiceConfig) -> RawConfig {
        RawConfig {
            config_version: 1,
            service,
            lifecycle,
        }
    }

    #[test]
    fn defaults_are_valid() {
        let errors = validate_config(&config(Default::default(), Default::default()));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_short_poll_interval() {
        let errors = validate_config(&config(
            RawLifecycleConfig {
                poll_interval_ms: Some(10),
                ..Default::default()
            },
            Default::default(),
        ));
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::PollIntervalTooShort { value: 10, .. }]
        ));
    }

    #[test]
    fn test_empty_paths() {
        let errors = validate_config(&config(
            Default::default(),
            RawServiceConfig {
                data_dir: Some(PathBuf::new()),
                shield_path: Some(PathBuf::new()),
                ..Default::default()
            },
        ));
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, ValidationError::EmptyPath { .. })));
    }
}
