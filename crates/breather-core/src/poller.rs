//! Foreground poller
//!
//! Ticks the lifecycle while the controlling surface is visible. Stops when
//! it is backgrounded; on resume it consumes restart signals and evaluates
//! immediately, since any amount of time may have passed unseen.

use breather_api::Phase;
use breather_util::Timestamp;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::Controller;

pub struct ForegroundPoller {
    controller: Controller,
    active: bool,
    phase_tx: watch::Sender<Phase>,
}

impl ForegroundPoller {
    pub fn new(controller: Controller) -> Self {
        let (phase_tx, _) = watch::channel(Phase::Idle);
        Self {
            controller,
            active: false,
            phase_tx,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Phase after every evaluation, for the display
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase_tx.subscribe()
    }

    fn evaluate(&self, now: Timestamp) -> Phase {
        let phase = self.controller.update_phase(now);
        let previous = *self.phase_tx.borrow();
        if previous.label() != phase.label() {
            info!(from = previous.label(), to = phase.label(), "Phase changed");
        }
        self.phase_tx.send_replace(phase);
        phase
    }

    /// The surface became visible
    pub fn on_became_active(&mut self, now: Timestamp) -> Phase {
        let signals = self.controller.take_signals();
        if !signals.is_empty() {
            info!(count = signals.len(), "Background state changed while away");
        }
        self.active = true;
        self.evaluate(now)
    }

    /// The surface was hidden; ticking stops
    pub fn on_backgrounded(&mut self) {
        debug!("Poller paused");
        self.active = false;
    }

    /// One timer tick. Does nothing while backgrounded.
    pub fn tick(&mut self, now: Timestamp) -> Option<Phase> {
        if !self.active {
            return None;
        }
        Some(self.evaluate(now))
    }

    /// Tick on the configured interval, following `visible`. Returns when
    /// the visibility sender is dropped.
    pub async fn run(mut self, mut visible: watch::Receiver<bool>) {
        let mut interval = time::interval(self.controller.settings().poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if *visible.borrow_and_update() {
            self.on_became_active(Timestamp::now());
            interval.reset();
        }

        loop {
            tokio::select! {
                changed = visible.changed() => {
                    if changed.is_err() {
                        debug!("Visibility channel closed, poller stopping");
                        break;
                    }
                    let now_visible = *visible.borrow_and_update();
                    if now_visible && !self.active {
                        self.on_became_active(Timestamp::now());
                        interval.reset();
                    } else if !now_visible && self.active {
                        self.on_backgrounded();
                    }
                }
                _ = interval.tick(), if self.active => {
                    self.tick(Timestamp::now());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Adapters;
    use breather_api::{BlockMode, RestartSignal, Selection, SelectionToken, SignalReason};
    use breather_config::LifecycleSettings;
    use breather_host_api::{HostCapabilities, MockEngine, MockNotifier, MockScheduler};
    use breather_store::{SqliteStore, StateStore};
    use std::sync::Arc;
    use std::time::Duration;

    const T0: f64 = 1_700_000_000.0;

    fn at(offset: f64) -> Timestamp {
        Timestamp::from_secs(T0 + offset)
    }

    fn poller(settings: LifecycleSettings) -> (ForegroundPoller, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let adapters = Adapters {
            store: store.clone(),
            engine: Arc::new(MockEngine::new()),
            scheduler: Arc::new(MockScheduler::new()),
            notifier: Arc::new(MockNotifier::new()),
        };
        let controller = Controller::new(adapters, settings, HostCapabilities::full());

        let mut selection = Selection::default();
        selection.applications.insert(SelectionToken::from("app.feed"));
        controller.select(selection).unwrap();

        (ForegroundPoller::new(controller), store)
    }

    #[test]
    fn backgrounded_poller_does_not_tick() {
        let (mut poller, _store) = poller(LifecycleSettings::default());
        poller.controller().enable(Some(BlockMode::Instant), at(0.0)).unwrap();

        assert_eq!(poller.tick(at(10.0)), None);

        poller.on_became_active(at(10.0));
        assert_eq!(poller.tick(at(20.0)), Some(Phase::Blocking { remaining_secs: 280 }));

        poller.on_backgrounded();
        assert_eq!(poller.tick(at(30.0)), None);
    }

    #[test]
    fn resume_consumes_signals_and_evaluates() {
        let (mut poller, store) = poller(LifecycleSettings::default());
        poller.controller().enable(Some(BlockMode::Instant), at(0.0)).unwrap();
        store
            .post_signal(&RestartSignal::new(SignalReason::BreakCompleted, at(5.0)))
            .unwrap();

        // Block ran out while hidden
        let phase = poller.on_became_active(at(900.0));
        assert_eq!(phase, Phase::BreakComplete);
        assert_eq!(store.pending_signals().unwrap(), 0);
        assert_eq!(*poller.subscribe().borrow(), Phase::BreakComplete);
    }

    #[tokio::test]
    async fn run_stops_when_visibility_closes() {
        let settings = LifecycleSettings {
            poll_interval: Duration::from_millis(100),
            ..LifecycleSettings::default()
        };
        let (poller, _store) = poller(settings);
        poller
            .controller()
            .enable(Some(BlockMode::Instant), Timestamp::now())
            .unwrap();
        let phases = poller.subscribe();
        let (visible_tx, visible_rx) = watch::channel(true);

        let handle = tokio::spawn(poller.run(visible_rx));
        time::sleep(Duration::from_millis(350)).await;
        visible_tx.send_replace(false);
        time::sleep(Duration::from_millis(100)).await;
        drop(visible_tx);

        handle.await.unwrap();
        assert!(phases.borrow().is_blocking());
    }
}
