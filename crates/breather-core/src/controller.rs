//! Foreground controller actions

use breather_api::{
    BlockMode, DelayedTrigger, Phase, RestartSignal, RestrictionConfig, Selection, Snapshot,
};
use breather_config::LifecycleSettings;
use breather_host_api::HostCapabilities;
use breather_store::{Key, StateStore, StoreExt};
use breather_util::{BreatherError, Result, Timestamp};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

use crate::{Adapters, Origin, arm, cleanup_orphans, disarm, update_phase};

/// What the controlling surface shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub phase: Phase,
    pub mode: BlockMode,
    pub enabled: bool,
    pub available: bool,
    pub selection_summary: String,
    pub pending_signals: usize,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.available {
            writeln!(f, "Protection unavailable on this host")?;
        }
        writeln!(f, "{}", self.phase)?;
        writeln!(f, "Mode: {}", self.mode)?;
        write!(f, "{}", self.selection_summary)
    }
}

/// The foreground execution context
pub struct Controller {
    adapters: Adapters,
    settings: LifecycleSettings,
    capabilities: HostCapabilities,
}

impl Controller {
    pub fn new(adapters: Adapters, settings: LifecycleSettings, capabilities: HostCapabilities) -> Self {
        Self {
            adapters,
            settings,
            capabilities,
        }
    }

    pub fn adapters(&self) -> &Adapters {
        &self.adapters
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    pub fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    /// Current store contents; an unreadable store reads as Idle
    pub fn snapshot(&self) -> Snapshot {
        self.adapters.store.load_snapshot().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read restriction state");
            Snapshot::default()
        })
    }

    fn ensure_available(&self) -> Result<()> {
        if self.capabilities.protection_available() {
            return Ok(());
        }
        warn!(capabilities = ?self.capabilities, "Protection unavailable on this host");
        Err(BreatherError::unavailable(
            "this host cannot apply restrictions or schedule intervals",
        ))
    }

    /// Store a new selection. Mode and enable flag are left as they are.
    pub fn select(&self, selection: Selection) -> Result<RestrictionConfig> {
        let store = &self.adapters.store;
        let mut config = store
            .load_config()
            .map_err(|e| BreatherError::store(e.to_string()))?;
        config.selection = selection;

        store
            .save_config(&config)
            .map_err(|e| BreatherError::store(e.to_string()))?;

        info!(targets = config.selection.len(), "Selection saved");
        Ok(config)
    }

    /// Complete setup and arm protection
    pub fn enable(&self, mode: Option<BlockMode>, now: Timestamp) -> Result<Phase> {
        self.ensure_available()?;

        let store = &self.adapters.store;
        let mut snapshot = store
            .load_snapshot()
            .map_err(|e| BreatherError::store(e.to_string()))?;
        if snapshot.config.selection.is_empty() {
            return Err(BreatherError::EmptySelection);
        }

        if let Some(mode) = mode {
            snapshot.config.mode = mode;
        }
        snapshot.config.enabled = true;
        snapshot.setup_completed = true;

        if snapshot.config.mode == BlockMode::Delayed
            && self.settings.delayed_trigger == DelayedTrigger::UsageThreshold
            && !self.capabilities.can_monitor_usage
        {
            warn!("Host does not track usage; threshold callbacks must come from an external monitor");
        }

        store
            .save_config(&snapshot.config)
            .map_err(|e| BreatherError::store(e.to_string()))?;
        store
            .set(Key::SetupCompleted, Value::from(true))
            .map_err(|e| BreatherError::store(e.to_string()))?;

        let decision = arm(&snapshot, &self.settings, now);
        self.adapters.execute(&decision.effects, now);

        info!(
            mode = %snapshot.config.mode,
            trigger = ?self.settings.delayed_trigger,
            phase = decision.phase.label(),
            "Protection enabled"
        );
        Ok(decision.phase)
    }

    /// Turn protection off, cancelling intervals and clearing the engine
    pub fn disable(&self, now: Timestamp) -> Phase {
        let decision = disarm();
        self.adapters.execute(&decision.effects, now);
        info!("Protection disabled");
        decision.phase
    }

    /// Evaluate the lifecycle once and carry out any transition
    pub fn update_phase(&self, now: Timestamp) -> Phase {
        if !self.capabilities.protection_available() {
            return Phase::Idle;
        }

        let snapshot = self.snapshot();
        let decision = update_phase(&snapshot, &self.settings, now, Origin::Foreground);
        if !decision.is_noop() {
            self.adapters.execute(&decision.effects, now);
        }

        debug!(phase = decision.phase.label(), remaining = ?decision.phase.remaining_secs(), "Phase updated");
        decision.phase
    }

    /// Wipe restrictions left by an earlier install. Returns whether
    /// anything was cleaned.
    pub fn cleanup_orphans(&self, now: Timestamp) -> bool {
        let Some(effects) = cleanup_orphans(&self.snapshot()) else {
            return false;
        };

        info!("First launch, clearing orphaned restrictions");
        self.adapters.execute(&effects, now);
        true
    }

    /// Consume pending restart signals
    pub fn take_signals(&self) -> Vec<RestartSignal> {
        match self.adapters.store.take_signals() {
            Ok(signals) => {
                for signal in &signals {
                    info!(id = %signal.id, reason = %signal.reason, at = %signal.at, "Restart signal");
                }
                signals
            }
            Err(e) => {
                warn!(error = %e, "Failed to read restart signals");
                Vec::new()
            }
        }
    }

    pub fn status(&self, now: Timestamp) -> Status {
        let phase = self.update_phase(now);
        let snapshot = self.snapshot();

        let status_word = match phase {
            Phase::Allowance { .. } => "selected for block",
            _ => "blocked",
        };
        let pending_signals = self.adapters.store.pending_signals().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to count restart signals");
            0
        });

        Status {
            phase,
            mode: snapshot.config.mode,
            enabled: snapshot.config.enabled,
            available: self.capabilities.protection_available(),
            selection_summary: snapshot.config.selection.summary(status_word),
            pending_signals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breather_api::SelectionToken;
    use breather_host_api::{MockEngine, MockNotifier, MockScheduler};
    use breather_store::SqliteStore;
    use breather_util::ActivityName;
    use std::sync::Arc;

    const T0: f64 = 1_700_000_000.0;

    fn at(offset: f64) -> Timestamp {
        Timestamp::from_secs(T0 + offset)
    }

    struct Harness {
        controller: Controller,
        store: Arc<SqliteStore>,
        engine: Arc<MockEngine>,
        scheduler: Arc<MockScheduler>,
        notifier: Arc<MockNotifier>,
    }

    fn harness_with(capabilities: HostCapabilities) -> Harness {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let engine = Arc::new(MockEngine::new());
        let scheduler = Arc::new(MockScheduler::new());
        let notifier = Arc::new(MockNotifier::new());
        let adapters = Adapters {
            store: store.clone(),
            engine: engine.clone(),
            scheduler: scheduler.clone(),
            notifier: notifier.clone(),
        };
        Harness {
            controller: Controller::new(adapters, LifecycleSettings::default(), capabilities),
            store,
            engine,
            scheduler,
            notifier,
        }
    }

    fn harness() -> Harness {
        harness_with(HostCapabilities::full())
    }

    fn selection() -> Selection {
        let mut selection = Selection::default();
        selection.applications.insert(SelectionToken::from("app.a"));
        selection.applications.insert(SelectionToken::from("app.b"));
        selection.categories.insert(SelectionToken::from("cat.games"));
        selection
    }

    #[test]
    fn enable_requires_selection() {
        let h = harness();
        let result = h.controller.enable(Some(BlockMode::Instant), at(0.0));
        assert!(matches!(result, Err(BreatherError::EmptySelection)));
        assert!(!h.engine.is_restricting());
    }

    #[test]
    fn enable_instant_applies_and_marks_setup() {
        let h = harness();
        h.controller.select(selection()).unwrap();

        let phase = h.controller.enable(Some(BlockMode::Instant), at(0.0)).unwrap();
        assert_eq!(phase, Phase::Blocking { remaining_secs: 300 });
        assert_eq!(h.engine.applied(), Some(selection()));
        assert!(h.scheduler.is_armed(&ActivityName::protection()));
        assert!(h.store.read_bool(Key::SetupCompleted).unwrap());
        assert_eq!(
            h.store.get(Key::DelayedBlockPhase).unwrap(),
            Some(Value::from("blocking"))
        );
    }

    #[test]
    fn rearm_replaces_previous_schedule() {
        let h = harness();
        h.controller.select(selection()).unwrap();
        h.controller.enable(Some(BlockMode::Instant), at(0.0)).unwrap();

        h.controller.enable(Some(BlockMode::Delayed), at(10.0)).unwrap();
        assert!(!h.engine.is_restricting());
        assert!(!h.scheduler.is_armed(&ActivityName::protection()));
        assert!(h.scheduler.is_armed(&ActivityName::delayed_block()));
        assert!(!h.store.read_timestamp(Key::BlockStartTime).unwrap().is_set());
    }

    #[test]
    fn poll_ends_block_and_notifies() {
        let h = harness();
        h.controller.select(selection()).unwrap();
        h.controller.enable(Some(BlockMode::Instant), at(0.0)).unwrap();

        assert_eq!(h.controller.update_phase(at(299.0)), Phase::Blocking { remaining_secs: 1 });
        assert_eq!(h.controller.update_phase(at(300.0)), Phase::BreakComplete);
        assert_eq!(h.controller.update_phase(at(301.0)), Phase::BreakComplete);

        assert!(!h.engine.is_restricting());
        assert!(h.scheduler.armed().is_empty());
        assert_eq!(h.notifier.sent().len(), 1);
        // Foreground transitions post no signals
        assert_eq!(h.store.pending_signals().unwrap(), 0);
    }

    #[test]
    fn disable_mid_block() {
        let h = harness();
        h.controller.select(selection()).unwrap();
        h.controller.enable(Some(BlockMode::Instant), at(0.0)).unwrap();

        assert_eq!(h.controller.disable(at(100.0)), Phase::Idle);
        let snapshot = h.controller.snapshot();
        assert!(!snapshot.config.enabled);
        assert_eq!(snapshot.config.selection, selection());
        assert!(!snapshot.state.block_start_time.is_set());
        assert!(!snapshot.state.allowance_start_time.is_set());
        assert!(!h.engine.is_restricting());

        assert_eq!(h.controller.update_phase(at(200.0)), Phase::Idle);
    }

    #[test]
    fn unavailable_host_degrades_to_idle() {
        let h = harness_with(HostCapabilities::none());
        h.controller.select(selection()).unwrap();

        let result = h.controller.enable(None, at(0.0));
        assert!(matches!(result, Err(BreatherError::Unavailable(_))));
        assert_eq!(h.controller.update_phase(at(1.0)), Phase::Idle);

        let status = h.controller.status(at(1.0));
        assert!(!status.available);
        assert!(status.to_string().starts_with("Protection unavailable"));
    }

    #[test]
    fn orphans_cleaned_on_first_launch_only() {
        let h = harness();
        h.store
            .set(Key::BlockStartTime, Value::from(T0))
            .unwrap();

        assert!(h.controller.cleanup_orphans(at(0.0)));
        assert_eq!(h.engine.clear_calls(), 1);
        assert!(!h.store.read_timestamp(Key::BlockStartTime).unwrap().is_set());

        h.controller.select(selection()).unwrap();
        h.controller.enable(None, at(10.0)).unwrap();
        h.controller.disable(at(20.0));
        assert!(!h.controller.cleanup_orphans(at(30.0)));
    }

    #[test]
    fn status_summarizes_selection() {
        let h = harness();
        h.controller.select(selection()).unwrap();
        h.controller.enable(Some(BlockMode::Delayed), at(0.0)).unwrap();

        let status = h.controller.status(at(60.0));
        assert_eq!(status.phase, Phase::Allowance { remaining_secs: 240 });
        assert_eq!(status.selection_summary, "2 apps + 1 category selected for block");
        assert_eq!(status.to_string(), "Allowance: 04:00 until block\nMode: delayed\n2 apps + 1 category selected for block");

        let status = h.controller.status(at(360.0));
        assert_eq!(status.phase, Phase::Blocking { remaining_secs: 240 });
        assert_eq!(status.selection_summary, "2 apps + 1 category blocked");
    }
}
