//! Host adapter traits

use breather_api::Selection;
use breather_util::{ActivityName, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors from host adapter operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Apply failed: {0}")]
    ApplyFailed(String),

    #[error("Clear failed: {0}")]
    ClearFailed(String),

    #[error("Schedule failed: {0}")]
    ScheduleFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// A named interval for the scheduler to deliver callbacks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub name: ActivityName,
    pub start_at: Timestamp,
    pub end_at: Timestamp,
    /// Repeat the interval daily
    pub recurring: bool,
    /// Deliver a threshold callback after this much foreground usage
    #[serde(default)]
    pub usage_threshold: Option<Duration>,
}

impl ScheduleRequest {
    /// Non-recurring interval starting at `start_at`
    pub fn one_shot(name: ActivityName, start_at: Timestamp, end_at: Timestamp) -> Self {
        Self {
            name,
            start_at,
            end_at,
            recurring: false,
            usage_threshold: None,
        }
    }

    /// Interval that repeats every day between the given bounds
    pub fn daily(name: ActivityName, start_at: Timestamp, end_at: Timestamp) -> Self {
        Self {
            name,
            start_at,
            end_at,
            recurring: true,
            usage_threshold: None,
        }
    }

    pub fn with_usage_threshold(mut self, threshold: Duration) -> Self {
        self.usage_threshold = Some(threshold);
        self
    }

    /// Whether a one-shot interval has started by `now`
    pub fn is_due(&self, now: Timestamp) -> bool {
        !self.recurring && self.start_at <= now
    }
}

/// Best-effort user alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn break_complete() -> Self {
        Self::new(
            "Break complete",
            "Your block has been lifted. You can open your apps again.",
        )
    }
}

/// Facade over the capability that hides and reveals restricted targets.
///
/// Both operations are idempotent. `clear` removes every restriction
/// category even when nothing was applied.
pub trait RestrictionEngine: Send + Sync {
    fn apply(&self, selection: &Selection) -> HostResult<()>;

    fn clear(&self) -> HostResult<()>;
}

/// Facade over the capability that fires lifecycle callbacks
pub trait Scheduler: Send + Sync {
    /// Arm a named interval, replacing any existing one with the same name
    fn arm(&self, request: &ScheduleRequest) -> HostResult<()>;

    /// Cancel the named intervals; unknown names are ignored
    fn cancel(&self, names: &[ActivityName]) -> HostResult<()>;
}

/// Best-effort notification capability
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice) -> HostResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_is_due_once_started() {
        let start = Timestamp::from_secs(1_700_000_300.0);
        let request = ScheduleRequest::one_shot(
            ActivityName::delayed_block(),
            start,
            start + Duration::from_secs(3600),
        );

        assert!(!request.is_due(Timestamp::from_secs(1_700_000_299.0)));
        assert!(request.is_due(start));
    }

    #[test]
    fn recurring_is_never_due() {
        let request = ScheduleRequest::daily(
            ActivityName::protection(),
            Timestamp::from_secs(1.0),
            Timestamp::from_secs(2.0),
        );
        assert!(!request.is_due(Timestamp::from_secs(100.0)));
    }

    #[test]
    fn request_serializes_without_threshold() {
        let json = r#"{"name":"breatherDelayedBlock","start_at":10.0,"end_at":20.0,"recurring":false}"#;
        let request: ScheduleRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.name, ActivityName::delayed_block());
        assert_eq!(request.usage_threshold, None);
    }
}
