//! Cross-process restart signals

use breather_util::{SignalId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a background context asks the foreground to re-derive its schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalReason {
    /// The usage counter crossed its threshold and a block began
    ThresholdReached,
    /// A scheduled interval start converted the allowance into a block
    BlockStarted,
    /// A background context ended the block
    BreakCompleted,
}

impl SignalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalReason::ThresholdReached => "threshold_reached",
            SignalReason::BlockStarted => "block_started",
            SignalReason::BreakCompleted => "break_completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "threshold_reached" => Some(SignalReason::ThresholdReached),
            "block_started" => Some(SignalReason::BlockStarted),
            "break_completed" => Some(SignalReason::BreakCompleted),
            _ => None,
        }
    }
}

impl fmt::Display for SignalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A restart signal record. Each record is consumed exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartSignal {
    pub id: SignalId,
    pub at: Timestamp,
    pub reason: SignalReason,
}

impl RestartSignal {
    pub fn new(reason: SignalReason, at: Timestamp) -> Self {
        Self {
            id: SignalId::new(),
            at,
            reason,
        }
    }
}
