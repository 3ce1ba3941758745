//! Raw configuration schema (as parsed from TOML)

use breather_api::DelayedTrigger;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Paths and integrations shared by all execution contexts
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Restriction lifecycle tuning
    #[serde(default)]
    pub lifecycle: RawLifecycleConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the shared store
    pub data_dir: Option<PathBuf>,

    /// Where the shield list is written (default: <data_dir>/shield.json)
    pub shield_path: Option<PathBuf>,

    /// Where schedule entries are persisted (default: <data_dir>/schedules.json)
    pub schedule_path: Option<PathBuf>,

    /// Send a desktop notification when a break completes
    pub notifications: Option<bool>,
}

/// Lifecycle settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLifecycleConfig {
    pub allowance_seconds: Option<u64>,
    pub block_seconds: Option<u64>,
    pub usage_threshold_minutes: Option<u32>,
    pub delayed_trigger: Option<DelayedTrigger>,
    pub poll_interval_ms: Option<u64>,
}
