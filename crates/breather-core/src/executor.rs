//! Carries lifecycle effects out against the store and host adapters

use breather_api::RestartSignal;
use breather_host_api::{Notifier, RestrictionEngine, Scheduler};
use breather_store::{Key, StateStore, timestamp_value};
use breather_util::Timestamp;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::Effect;

/// Everything an execution context needs to act on a decision
#[derive(Clone)]
pub struct Adapters {
    pub store: Arc<dyn StateStore>,
    pub engine: Arc<dyn RestrictionEngine>,
    pub scheduler: Arc<dyn Scheduler>,
    pub notifier: Arc<dyn Notifier>,
}

/// Failures observed while executing effects. None of them is fatal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Execution {
    pub host_failures: usize,
    pub store_failures: usize,
}

impl Execution {
    pub fn is_clean(&self) -> bool {
        self.host_failures == 0 && self.store_failures == 0
    }
}

fn store_entry(effect: &Effect) -> Option<(Key, Value)> {
    match effect {
        Effect::SetBlockStart(ts) => Some((Key::BlockStartTime, timestamp_value(*ts))),
        Effect::SetAllowanceStart(ts) => Some((Key::AllowanceStartTime, timestamp_value(*ts))),
        Effect::SetUsageMinutes(n) => Some((Key::TotalMinutesUsed, Value::from(*n))),
        Effect::SetEnabled(enabled) => Some((Key::ProtectionEnabled, Value::from(*enabled))),
        Effect::SetPhaseLabel(label) => Some((Key::DelayedBlockPhase, Value::from(*label))),
        _ => None,
    }
}

impl Adapters {
    /// Execute effects.
    ///
    /// Engine and scheduler calls run first, in order. Store writes follow in
    /// one transaction whether or not the host calls succeeded, then restart
    /// signals, then notifications. Failures are logged and never rolled back;
    /// the next trigger re-evaluates from whatever landed.
    pub fn execute(&self, effects: &[Effect], now: Timestamp) -> Execution {
        let mut execution = Execution::default();

        for effect in effects {
            let result = match effect {
                Effect::ApplyShield(selection) => self.engine.apply(selection),
                Effect::ClearShield => self.engine.clear(),
                Effect::ArmSchedule(request) => self.scheduler.arm(request),
                Effect::CancelSchedules(names) => self.scheduler.cancel(names),
                _ => continue,
            };
            if let Err(e) = result {
                warn!(effect = ?effect, error = %e, "Host call failed");
                execution.host_failures += 1;
            }
        }

        let writes: Vec<(Key, Value)> = effects.iter().filter_map(store_entry).collect();
        if !writes.is_empty() {
            if let Err(e) = self.store.set_many(&writes) {
                warn!(count = writes.len(), error = %e, "Failed to persist restriction state");
                execution.store_failures += 1;
            }
        }

        for effect in effects {
            match effect {
                Effect::PostSignal(reason) => {
                    if let Err(e) = self.store.post_signal(&RestartSignal::new(*reason, now)) {
                        warn!(reason = %reason, error = %e, "Failed to post restart signal");
                        execution.store_failures += 1;
                    }
                }
                Effect::Notify(notice) => {
                    // Best effort only
                    if let Err(e) = self.notifier.notify(notice) {
                        warn!(title = %notice.title, error = %e, "Failed to send notification");
                    }
                }
                _ => {}
            }
        }

        debug!(effects = effects.len(), ?execution, "Effects executed");
        execution
    }
}
