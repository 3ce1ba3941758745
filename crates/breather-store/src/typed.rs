//! Typed view of the shared namespace
//!
//! Absent keys read exactly like zero/false/default so that a process that
//! starts before anything was written sees the Idle configuration.

use breather_api::{BlockMode, RestrictionConfig, RestrictionState, Selection, Snapshot};
use breather_util::Timestamp;
use serde_json::Value;
use tracing::warn;

use crate::{Key, StateStore, StoreResult};

/// Encode a selection as the opaque blob stored under `selectedApp`
pub fn selection_value(selection: &Selection) -> StoreResult<Value> {
    Ok(Value::String(serde_json::to_string(selection)?))
}

/// Encode a timestamp; zero clears it
pub fn timestamp_value(ts: Timestamp) -> Value {
    Value::from(ts.as_secs())
}

/// Typed reads and writes available on every [`StateStore`]
pub trait StoreExt: StateStore {
    fn read_bool(&self, key: Key) -> StoreResult<bool> {
        Ok(self.get(key)?.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    fn read_timestamp(&self, key: Key) -> StoreResult<Timestamp> {
        Ok(self
            .get(key)?
            .and_then(|v| v.as_f64())
            .map(Timestamp::from_secs)
            .unwrap_or(Timestamp::ZERO))
    }

    fn read_u32(&self, key: Key) -> StoreResult<u32> {
        Ok(self
            .get(key)?
            .and_then(|v| v.as_u64())
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0))
    }

    /// Read the selection. An undecodable blob is treated as no selection.
    fn read_selection(&self) -> StoreResult<Selection> {
        let Some(value) = self.get(Key::SelectedApp)? else {
            return Ok(Selection::default());
        };

        let decoded = match value.as_str() {
            Some(blob) => serde_json::from_str::<Selection>(blob).map_err(|e| e.to_string()),
            None => Err("selection blob is not a string".to_string()),
        };

        match decoded {
            Ok(selection) => Ok(selection),
            Err(error) => {
                warn!(key = %Key::SelectedApp, error = %error, "Failed to decode selection, treating as empty");
                Ok(Selection::default())
            }
        }
    }

    fn read_mode(&self) -> StoreResult<BlockMode> {
        let Some(value) = self.get(Key::BlockMode)? else {
            return Ok(BlockMode::default());
        };

        match value.as_str().map(str::parse::<BlockMode>) {
            Some(Ok(mode)) => Ok(mode),
            _ => {
                warn!(key = %Key::BlockMode, value = %value, "Unknown block mode, using default");
                Ok(BlockMode::default())
            }
        }
    }

    fn load_config(&self) -> StoreResult<RestrictionConfig> {
        Ok(RestrictionConfig {
            selection: self.read_selection()?,
            mode: self.read_mode()?,
            enabled: self.read_bool(Key::ProtectionEnabled)?,
        })
    }

    fn load_state(&self) -> StoreResult<RestrictionState> {
        Ok(RestrictionState {
            block_start_time: self.read_timestamp(Key::BlockStartTime)?,
            allowance_start_time: self.read_timestamp(Key::AllowanceStartTime)?,
            cumulative_usage_minutes: self.read_u32(Key::TotalMinutesUsed)?,
        })
    }

    fn load_snapshot(&self) -> StoreResult<Snapshot> {
        Ok(Snapshot {
            config: self.load_config()?,
            state: self.load_state()?,
            setup_completed: self.read_bool(Key::SetupCompleted)?,
        })
    }

    /// Overwrite the restriction configuration in one transaction
    fn save_config(&self, config: &RestrictionConfig) -> StoreResult<()> {
        self.set_many(&[
            (Key::SelectedApp, selection_value(&config.selection)?),
            (Key::BlockMode, Value::from(config.mode.as_str())),
            (Key::ProtectionEnabled, Value::from(config.enabled)),
        ])
    }
}

impl<S: StateStore + ?Sized> StoreExt for S {}
