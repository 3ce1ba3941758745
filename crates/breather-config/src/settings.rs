//! Validated settings

use crate::schema::{RawConfig, RawLifecycleConfig, RawServiceConfig};
use breather_api::DelayedTrigger;
use breather_util::{default_data_dir, schedule_path, shield_path, store_path};
use std::path::PathBuf;
use std::time::Duration;

/// Grace period before a delayed block
pub const DEFAULT_ALLOWANCE_SECS: u64 = 300;

/// Length of a block
pub const DEFAULT_BLOCK_SECS: u64 = 300;

/// Usage minutes that end the allowance in the threshold variant
pub const DEFAULT_USAGE_THRESHOLD_MINUTES: u32 = 5;

/// Foreground poll period
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Validated settings shared by every execution context
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub service: ServiceConfig,
    pub lifecycle: LifecycleSettings,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            lifecycle: LifecycleSettings::from_raw(raw.lifecycle),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub shield_path: PathBuf,
    pub schedule_path: PathBuf,
    pub notifications: bool,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        let data_dir = raw.data_dir.unwrap_or_else(default_data_dir);
        Self {
            shield_path: raw.shield_path.unwrap_or_else(|| shield_path(&data_dir)),
            schedule_path: raw.schedule_path.unwrap_or_else(|| schedule_path(&data_dir)),
            notifications: raw.notifications.unwrap_or(true),
            data_dir,
        }
    }

    /// Use a different data directory, re-deriving any path that was not set explicitly
    pub fn with_data_dir(self, data_dir: PathBuf) -> Self {
        let shield_path = if self.shield_path == shield_path(&self.data_dir) {
            shield_path(&data_dir)
        } else {
            self.shield_path
        };
        let schedule_path = if self.schedule_path == schedule_path(&self.data_dir) {
            schedule_path(&data_dir)
        } else {
            self.schedule_path
        };

        Self {
            data_dir,
            shield_path,
            schedule_path,
            notifications: self.notifications,
        }
    }

    /// Path of the shared state database
    pub fn store_path(&self) -> PathBuf {
        store_path(&self.data_dir)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawServiceConfig::default())
    }
}

/// Durations and variant selection for the restriction lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    pub allowance: Duration,
    pub block: Duration,
    pub usage_threshold_minutes: u32,
    pub delayed_trigger: DelayedTrigger,
    pub poll_interval: Duration,
}

impl LifecycleSettings {
    fn from_raw(raw: RawLifecycleConfig) -> Self {
        Self {
            allowance: Duration::from_secs(raw.allowance_seconds.unwrap_or(DEFAULT_ALLOWANCE_SECS)),
            block: Duration::from_secs(raw.block_seconds.unwrap_or(DEFAULT_BLOCK_SECS)),
            usage_threshold_minutes: raw
                .usage_threshold_minutes
                .unwrap_or(DEFAULT_USAGE_THRESHOLD_MINUTES),
            delayed_trigger: raw.delayed_trigger.unwrap_or_default(),
            poll_interval: Duration::from_millis(
                raw.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
        }
    }

    /// Same settings with a different delayed-mode trigger
    pub fn with_trigger(mut self, trigger: DelayedTrigger) -> Self {
        self.delayed_trigger = trigger;
        self
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self::from_raw(RawLifecycleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_override_moves_derived_paths() {
        let service = ServiceConfig::from_raw(RawServiceConfig {
            data_dir: Some(PathBuf::from("/a")),
            shield_path: None,
            schedule_path: Some(PathBuf::from("/custom/schedules.json")),
            notifications: None,
        });

        let moved = service.with_data_dir(PathBuf::from("/b"));
        assert_eq!(moved.shield_path, PathBuf::from("/b/shield.json"));
        assert_eq!(moved.schedule_path, PathBuf::from("/custom/schedules.json"));
        assert_eq!(moved.store_path(), PathBuf::from("/b/state.db"));
    }
}
