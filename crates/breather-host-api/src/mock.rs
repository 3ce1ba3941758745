//! Mock host adapters for testing

use breather_api::Selection;
use breather_util::ActivityName;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

use crate::{
    HostError, HostResult, Notice, Notifier, RestrictionEngine, ScheduleRequest, Scheduler,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn flag(mutex: &Mutex<bool>) -> bool {
    *lock(mutex)
}

/// Records what is currently applied
#[derive(Default)]
pub struct MockEngine {
    applied: Arc<Mutex<Option<Selection>>>,
    apply_calls: Arc<Mutex<usize>>,
    clear_calls: Arc<Mutex<usize>>,

    /// Configure apply to fail
    pub fail_apply: Arc<Mutex<bool>>,

    /// Configure clear to fail
    pub fail_clear: Arc<Mutex<bool>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The selection currently applied, if any
    pub fn applied(&self) -> Option<Selection> {
        lock(&self.applied).clone()
    }

    pub fn is_restricting(&self) -> bool {
        lock(&self.applied).is_some()
    }

    pub fn apply_calls(&self) -> usize {
        *lock(&self.apply_calls)
    }

    pub fn clear_calls(&self) -> usize {
        *lock(&self.clear_calls)
    }

    pub fn set_fail_apply(&self, fail: bool) {
        *lock(&self.fail_apply) = fail;
    }

    pub fn set_fail_clear(&self, fail: bool) {
        *lock(&self.fail_clear) = fail;
    }
}

impl RestrictionEngine for MockEngine {
    fn apply(&self, selection: &Selection) -> HostResult<()> {
        *lock(&self.apply_calls) += 1;
        if flag(&self.fail_apply) {
            return Err(HostError::ApplyFailed("Mock apply failure".into()));
        }
        *lock(&self.applied) = Some(selection.clone());
        Ok(())
    }

    fn clear(&self) -> HostResult<()> {
        *lock(&self.clear_calls) += 1;
        if flag(&self.fail_clear) {
            return Err(HostError::ClearFailed("Mock clear failure".into()));
        }
        *lock(&self.applied) = None;
        Ok(())
    }
}

/// Keeps armed intervals in memory, keyed by name
#[derive(Default)]
pub struct MockScheduler {
    armed: Arc<Mutex<BTreeMap<ActivityName, ScheduleRequest>>>,

    /// Configure arm to fail
    pub fail_arm: Arc<Mutex<bool>>,
}

impl MockScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed(&self) -> Vec<ScheduleRequest> {
        lock(&self.armed).values().cloned().collect()
    }

    pub fn get(&self, name: &ActivityName) -> Option<ScheduleRequest> {
        lock(&self.armed).get(name).cloned()
    }

    pub fn is_armed(&self, name: &ActivityName) -> bool {
        lock(&self.armed).contains_key(name)
    }

    pub fn set_fail_arm(&self, fail: bool) {
        *lock(&self.fail_arm) = fail;
    }
}

impl Scheduler for MockScheduler {
    fn arm(&self, request: &ScheduleRequest) -> HostResult<()> {
        if flag(&self.fail_arm) {
            return Err(HostError::ScheduleFailed("Mock arm failure".into()));
        }
        lock(&self.armed).insert(request.name.clone(), request.clone());
        Ok(())
    }

    fn cancel(&self, names: &[ActivityName]) -> HostResult<()> {
        let mut armed = lock(&self.armed);
        for name in names {
            armed.remove(name);
        }
        Ok(())
    }
}

/// Collects notices
#[derive(Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<Notice>>>,

    /// Configure notify to fail
    pub fail_notify: Arc<Mutex<bool>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notice> {
        lock(&self.sent).clone()
    }

    pub fn set_fail_notify(&self, fail: bool) {
        *lock(&self.fail_notify) = fail;
    }
}

impl Notifier for MockNotifier {
    fn notify(&self, notice: &Notice) -> HostResult<()> {
        if flag(&self.fail_notify) {
            return Err(HostError::Internal("Mock notify failure".into()));
        }
        lock(&self.sent).push(notice.clone());
        Ok(())
    }
}

/// Notifier that only writes to the log; used when notifications are off
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) -> HostResult<()> {
        info!(title = %notice.title, body = %notice.body, "Notice");
        Ok(())
    }
}
