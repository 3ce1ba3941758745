//! Integration tests for breather
//!
//! Each execution context gets its own store handle on one database file,
//! the way separate processes would, and the Linux file adapters stand in
//! for the restriction engine and scheduler.

use breather_api::{BlockMode, DelayedTrigger, Phase, Selection, SelectionToken, ShieldTarget};
use breather_config::LifecycleSettings;
use breather_core::{Adapters, BackgroundMonitor, Controller, ForegroundPoller, ShieldProvider};
use breather_host_api::{HostCapabilities, LogNotifier};
use breather_host_linux::{JsonScheduler, ShieldFile, ShieldList};
use breather_store::{Key, SqliteStore, StateStore, StoreExt};
use breather_util::{ActivityName, EventName, Timestamp};
use std::sync::Arc;
use tempfile::TempDir;

const T0: f64 = 1_700_000_000.0;

fn at(offset: f64) -> Timestamp {
    Timestamp::from_secs(T0 + offset)
}

/// Shared on-disk state for one simulated device
struct Device {
    dir: TempDir,
    settings: LifecycleSettings,
}

impl Device {
    fn new(settings: LifecycleSettings) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            settings,
        }
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::open(self.dir.path().join("state.db")).unwrap()
    }

    fn scheduler(&self) -> JsonScheduler {
        JsonScheduler::new(self.dir.path().join("schedules.json"))
    }

    fn shield_list(&self) -> ShieldList {
        ShieldFile::new(self.dir.path().join("shield.json")).read()
    }

    /// Fresh handles, as a newly started process would open them
    fn adapters(&self) -> Adapters {
        Adapters {
            store: Arc::new(self.store()),
            engine: Arc::new(ShieldFile::new(self.dir.path().join("shield.json"))),
            scheduler: Arc::new(self.scheduler()),
            notifier: Arc::new(LogNotifier),
        }
    }

    fn controller(&self) -> Controller {
        Controller::new(self.adapters(), self.settings, HostCapabilities::linux_desktop())
    }

    fn monitor(&self) -> BackgroundMonitor {
        BackgroundMonitor::new(self.adapters(), self.settings)
    }

    fn shield(&self) -> ShieldProvider {
        ShieldProvider::new(self.adapters(), self.settings)
    }
}

fn selection() -> Selection {
    let mut selection = Selection::default();
    selection.applications.insert(SelectionToken::from("org.example.Feed"));
    selection.web_domains.insert(SelectionToken::from("feed.example.com"));
    selection
}

fn target() -> ShieldTarget {
    ShieldTarget::Application {
        token: SelectionToken::from("org.example.Feed"),
    }
}

fn enabled_device(mode: BlockMode, settings: LifecycleSettings) -> Device {
    let device = Device::new(settings);
    let controller = device.controller();
    controller.select(selection()).unwrap();
    controller.enable(Some(mode), at(0.0)).unwrap();
    device
}

#[test]
fn test_delayed_block_handoff_between_contexts() {
    let device = enabled_device(BlockMode::Delayed, LifecycleSettings::default());
    assert!(!device.shield_list().active);

    let mut poller = ForegroundPoller::new(device.controller());
    assert_eq!(poller.on_became_active(at(0.0)), Phase::Allowance { remaining_secs: 300 });
    poller.on_backgrounded();

    // Scheduler fires while the foreground is hidden
    assert!(device.scheduler().take_due(at(299.0)).unwrap().is_empty());
    let due = device.scheduler().take_due(at(300.0)).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(device.monitor().dispatch(&due, at(300.0)), 1);

    let list = device.shield_list();
    assert!(list.active);
    assert_eq!(list.selection, selection());

    let content = device.shield().render(&target(), at(400.0));
    assert_eq!(content.remaining_secs, 200);
    assert_eq!(content.subtitle, "You can open this again in 03:20");

    // Foreground resumes and sees the background change
    assert_eq!(device.store().pending_signals().unwrap(), 1);
    assert_eq!(poller.on_became_active(at(450.0)), Phase::Blocking { remaining_secs: 150 });
    assert_eq!(device.store().pending_signals().unwrap(), 0);

    // The shield is the first to notice the block ran out
    let content = device.shield().render(&target(), at(600.0));
    assert_eq!(content.title, "Break complete");
    assert!(!device.shield_list().active);
    assert!(device.scheduler().entries().unwrap().is_empty());

    assert_eq!(poller.tick(at(601.0)), Some(Phase::BreakComplete));
    assert_eq!(device.store().pending_signals().unwrap(), 1);
}

#[test]
fn test_poller_first_then_late_interval_start() {
    let device = enabled_device(BlockMode::Delayed, LifecycleSettings::default());
    let controller = device.controller();

    assert_eq!(controller.update_phase(at(300.0)), Phase::Blocking { remaining_secs: 300 });
    assert_eq!(
        device.monitor().interval_did_start(&ActivityName::delayed_block(), at(302.0)),
        None
    );

    let store = device.store();
    assert_eq!(store.read_timestamp(Key::BlockStartTime).unwrap(), at(300.0));
    assert_eq!(store.pending_signals().unwrap(), 0);
}

#[test]
fn test_late_interval_start_converges_with_poller() {
    let device = enabled_device(BlockMode::Delayed, LifecycleSettings::default());

    // Dispatch ran five seconds late
    let due = device.scheduler().take_due(at(305.0)).unwrap();
    assert_eq!(device.monitor().dispatch(&due, at(305.0)), 1);

    let store = device.store();
    assert_eq!(store.read_timestamp(Key::BlockStartTime).unwrap(), at(300.0));
    assert!(!store.read_timestamp(Key::AllowanceStartTime).unwrap().is_set());

    assert_eq!(
        device.controller().update_phase(at(310.0)),
        Phase::Blocking { remaining_secs: 290 }
    );
}

#[test]
fn test_instant_block_cleared_once() {
    let device = enabled_device(BlockMode::Instant, LifecycleSettings::default());
    assert!(device.shield_list().active);
    assert_eq!(device.scheduler().entries().unwrap().len(), 1);

    let controller = device.controller();
    assert_eq!(controller.update_phase(at(60.0)), Phase::Blocking { remaining_secs: 240 });

    for offset in [300.0, 301.0, 400.0] {
        assert_eq!(controller.update_phase(at(offset)), Phase::BreakComplete);
    }
    assert!(!device.shield_list().active);
    assert!(device.scheduler().entries().unwrap().is_empty());
    assert_eq!(
        device.store().get(Key::DelayedBlockPhase).unwrap(),
        Some(serde_json::Value::from("break_complete"))
    );
}

#[test]
fn test_usage_threshold_across_processes() {
    let settings = LifecycleSettings::default().with_trigger(DelayedTrigger::UsageThreshold);
    let device = enabled_device(BlockMode::Delayed, settings);
    let protection = ActivityName::protection();
    let event = EventName::threshold_reached();

    for minute in 1..=4 {
        // Each callback is a separate process
        device
            .monitor()
            .event_did_reach_threshold(&protection, &event, at(f64::from(minute) * 60.0));
    }
    assert_eq!(device.store().read_u32(Key::TotalMinutesUsed).unwrap(), 4);
    assert!(!device.shield_list().active);

    device
        .monitor()
        .event_did_reach_threshold(&protection, &event, at(300.0));
    assert_eq!(device.store().read_u32(Key::TotalMinutesUsed).unwrap(), 0);
    assert!(device.shield_list().active);

    let mut poller = ForegroundPoller::new(device.controller());
    assert_eq!(poller.on_became_active(at(330.0)), Phase::Blocking { remaining_secs: 270 });
    assert_eq!(device.store().pending_signals().unwrap(), 0);
}

#[test]
fn test_disable_cancels_pending_interval() {
    let device = enabled_device(BlockMode::Delayed, LifecycleSettings::default());
    assert_eq!(device.controller().disable(at(100.0)), Phase::Idle);

    assert!(device.scheduler().take_due(at(300.0)).unwrap().is_empty());

    // A callback that was already in flight is a no-op
    assert_eq!(
        device.monitor().interval_did_start(&ActivityName::delayed_block(), at(300.0)),
        None
    );
    assert!(!device.shield_list().active);

    let snapshot = device.store().load_snapshot().unwrap();
    assert!(!snapshot.config.enabled);
    assert_eq!(snapshot.config.selection, selection());
    assert_eq!(device.controller().update_phase(at(400.0)), Phase::Idle);
}

#[test]
fn test_shield_with_unset_block() {
    let device = Device::new(LifecycleSettings::default());

    let content = device.shield().render(&target(), at(301.0));
    assert_eq!(content.remaining_secs, 300);
    assert_eq!(content.title, "Taking a break");
    assert_eq!(device.store().pending_signals().unwrap(), 0);
}
