//! Store trait definitions

use breather_api::RestartSignal;
use serde_json::Value;
use std::fmt;

use crate::StoreResult;

/// Keys of the shared namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Serialized selection token set
    SelectedApp,
    /// Master enable switch
    ProtectionEnabled,
    /// `instant` or `delayed`
    BlockMode,
    /// Start of the active block, 0 when none
    BlockStartTime,
    /// Start of the active allowance, 0 when none
    AllowanceStartTime,
    /// Threshold-variant usage counter
    TotalMinutesUsed,
    /// Diagnostic phase label
    DelayedBlockPhase,
    /// Set once the user finished setup; gates orphan cleanup
    SetupCompleted,
}

impl Key {
    pub fn as_str(&self) -> &'static str {
        match self {
            Key::SelectedApp => "selectedApp",
            Key::ProtectionEnabled => "isProtectionEnabled",
            Key::BlockMode => "blockMode",
            Key::BlockStartTime => "blockStartTime",
            Key::AllowanceStartTime => "allowanceStartTime",
            Key::TotalMinutesUsed => "totalMinutesUsed",
            Key::DelayedBlockPhase => "delayedBlockPhase",
            Key::SetupCompleted => "hasCompletedSetup",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable key/value map shared between processes.
///
/// Atomic per key only from the caller's point of view: readers must
/// tolerate any interleaving of writes from other processes.
pub trait StateStore: Send + Sync {
    // Key/value

    /// Read one key
    fn get(&self, key: Key) -> StoreResult<Option<Value>>;

    /// Write one key
    fn set(&self, key: Key, value: Value) -> StoreResult<()>;

    /// Write several keys in one transaction
    fn set_many(&self, entries: &[(Key, Value)]) -> StoreResult<()>;

    // Restart signals

    /// Record a signal for the foreground context
    fn post_signal(&self, signal: &RestartSignal) -> StoreResult<()>;

    /// Remove and return every pending signal, oldest first
    fn take_signals(&self) -> StoreResult<Vec<RestartSignal>>;

    /// Number of signals waiting to be consumed
    fn pending_signals(&self) -> StoreResult<usize>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
