//! Background monitor callback handler
//!
//! Runs without any UI and without the controller. Reads the store, decides,
//! writes back, and leaves a restart signal for the foreground.

use breather_api::{Phase, Snapshot};
use breather_config::LifecycleSettings;
use breather_host_api::ScheduleRequest;
use breather_store::StoreExt;
use breather_util::{ActivityName, EventName, Timestamp};
use tracing::{debug, info, warn};

use crate::{Adapters, Decision, interval_started, threshold_reached};

pub struct BackgroundMonitor {
    adapters: Adapters,
    settings: LifecycleSettings,
}

impl BackgroundMonitor {
    pub fn new(adapters: Adapters, settings: LifecycleSettings) -> Self {
        Self { adapters, settings }
    }

    fn snapshot(&self) -> Snapshot {
        self.adapters.store.load_snapshot().unwrap_or_else(|e| {
            warn!(error = %e, "Monitor failed to read restriction state");
            Snapshot::default()
        })
    }

    fn run(&self, decision: Option<Decision>, now: Timestamp) -> Option<Phase> {
        let decision = decision?;
        self.adapters.execute(&decision.effects, now);
        Some(decision.phase)
    }

    /// A scheduled interval began. Returns the new phase if it acted.
    pub fn interval_did_start(&self, activity: &ActivityName, now: Timestamp) -> Option<Phase> {
        info!(activity = %activity, "Interval started");
        let decision = interval_started(&self.snapshot(), &self.settings, activity, now);
        self.run(decision, now)
    }

    /// Usage of the monitored selection crossed a threshold
    pub fn event_did_reach_threshold(
        &self,
        activity: &ActivityName,
        event: &EventName,
        now: Timestamp,
    ) -> Option<Phase> {
        info!(activity = %activity, event = %event, "Threshold reached");
        let decision = threshold_reached(&self.snapshot(), &self.settings, activity, event, now);
        self.run(decision, now)
    }

    /// A scheduled interval ended. Nothing to do beyond noting it.
    pub fn interval_did_end(&self, activity: &ActivityName) {
        info!(activity = %activity, "Interval ended");
    }

    /// Deliver interval-start callbacks for due schedule entries.
    /// Returns how many of them changed state.
    pub fn dispatch(&self, due: &[ScheduleRequest], now: Timestamp) -> usize {
        let mut acted = 0;
        for request in due {
            if self.interval_did_start(&request.name, now).is_some() {
                acted += 1;
            }
        }
        debug!(due = due.len(), acted, "Dispatch complete");
        acted
    }
}
