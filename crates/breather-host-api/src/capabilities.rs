//! Host capabilities model

use serde::{Deserialize, Serialize};

/// Describes what a host can do for the lifecycle core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCapabilities {
    /// Can apply and clear restrictions
    pub can_restrict: bool,

    /// Can deliver interval-start callbacks at wall-clock times
    pub can_schedule: bool,

    /// Can deliver usage threshold callbacks
    pub can_monitor_usage: bool,

    /// Can show user notifications (optional)
    pub can_notify: bool,
}

impl HostCapabilities {
    /// A host with nothing available; protection is reported unavailable
    pub fn none() -> Self {
        Self {
            can_restrict: false,
            can_schedule: false,
            can_monitor_usage: false,
            can_notify: false,
        }
    }

    /// Everything the lifecycle can use
    pub fn full() -> Self {
        Self {
            can_restrict: true,
            can_schedule: true,
            can_monitor_usage: true,
            can_notify: true,
        }
    }

    /// Desktop Linux: file-backed shield and schedules, no usage tracking
    pub fn linux_desktop() -> Self {
        Self {
            can_restrict: true,
            can_schedule: true,
            can_monitor_usage: false,
            can_notify: true,
        }
    }

    /// Minimum needed for any arming to make sense
    pub fn protection_available(&self) -> bool {
        self.can_restrict && self.can_schedule
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::full()
    }
}
