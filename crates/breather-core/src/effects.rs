//! Side effects decided by the lifecycle

use breather_api::{Phase, Selection, SignalReason};
use breather_host_api::{Notice, ScheduleRequest};
use breather_util::{ActivityName, Timestamp};

/// One side effect for an execution context to carry out
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask the restriction engine to shield the selection
    ApplyShield(Selection),

    /// Remove every restriction category from the engine
    ClearShield,

    /// Arm a named interval
    ArmSchedule(ScheduleRequest),

    /// Cancel named intervals
    CancelSchedules(Vec<ActivityName>),

    // Store writes
    SetBlockStart(Timestamp),
    SetAllowanceStart(Timestamp),
    SetUsageMinutes(u32),
    SetEnabled(bool),
    SetPhaseLabel(&'static str),

    /// Tell the foreground context that a background context changed state
    PostSignal(SignalReason),

    /// Best-effort user alert
    Notify(Notice),
}

/// Result of evaluating the lifecycle once
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub phase: Phase,
    pub effects: Vec<Effect>,
}

impl Decision {
    pub fn new(phase: Phase, effects: Vec<Effect>) -> Self {
        Self { phase, effects }
    }

    /// A phase report with nothing to do
    pub fn settled(phase: Phase) -> Self {
        Self {
            phase,
            effects: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.effects.is_empty()
    }
}
