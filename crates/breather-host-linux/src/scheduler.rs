//! File-backed scheduler
//!
//! Armed intervals are kept in a JSON file. A separate `monitor dispatch`
//! invocation (cron, systemd timer, or the poller) calls [`JsonScheduler::take_due`]
//! and delivers interval-start callbacks for one-shot entries that have begun.
//! Every read-modify-write of the file holds its advisory lock, so arming
//! from the controller and dispatching from the monitor never lose entries.

use breather_host_api::{HostError, HostResult, ScheduleRequest, Scheduler};
use breather_util::{ActivityName, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{FileLock, lock_exclusive, read_optional, write_atomic};

#[derive(Debug, Default, Serialize, Deserialize)]
struct ScheduleFile {
    #[serde(default)]
    entries: Vec<ScheduleRequest>,
}

pub struct JsonScheduler {
    path: PathBuf,
}

impl JsonScheduler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> HostResult<FileLock> {
        lock_exclusive(&self.path)
            .map_err(|e| HostError::ScheduleFailed(format!("failed to lock schedules: {e}")))
    }

    fn load(&self) -> HostResult<ScheduleFile> {
        let Some(content) = read_optional(&self.path)? else {
            return Ok(ScheduleFile::default());
        };

        match serde_json::from_str(&content) {
            Ok(file) => Ok(file),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt schedule file, treating as empty");
                Ok(ScheduleFile::default())
            }
        }
    }

    fn save(&self, file: &ScheduleFile) -> HostResult<()> {
        let serialized = serde_json::to_vec_pretty(file)
            .map_err(|e| HostError::ScheduleFailed(format!("failed to serialize schedules: {e}")))?;
        write_atomic(&self.path, &serialized)?;
        Ok(())
    }

    /// All armed intervals
    pub fn entries(&self) -> HostResult<Vec<ScheduleRequest>> {
        let _guard = self.guard()?;
        Ok(self.load()?.entries)
    }

    /// Remove and return the one-shot intervals that have started by `now`
    pub fn take_due(&self, now: Timestamp) -> HostResult<Vec<ScheduleRequest>> {
        let _guard = self.guard()?;
        let mut file = self.load()?;

        let (due, pending): (Vec<_>, Vec<_>) =
            file.entries.into_iter().partition(|entry| entry.is_due(now));
        file.entries = pending;

        if !due.is_empty() {
            self.save(&file)?;
            debug!(count = due.len(), "Dispatching due intervals");
        }
        Ok(due)
    }
}

impl Scheduler for JsonScheduler {
    fn arm(&self, request: &ScheduleRequest) -> HostResult<()> {
        let _guard = self.guard()?;
        let mut file = self.load()?;

        file.entries.retain(|entry| entry.name != request.name);
        file.entries.push(request.clone());
        self.save(&file)?;

        info!(
            name = %request.name,
            start_at = %request.start_at,
            end_at = %request.end_at,
            recurring = request.recurring,
            "Interval armed"
        );
        Ok(())
    }

    fn cancel(&self, names: &[ActivityName]) -> HostResult<()> {
        let _guard = self.guard()?;
        let mut file = self.load()?;

        let before = file.entries.len();
        file.entries.retain(|entry| !names.contains(&entry.name));
        if file.entries.len() != before {
            self.save(&file)?;
            info!(removed = before - file.entries.len(), "Intervals cancelled");
        }
        Ok(())
    }
}
