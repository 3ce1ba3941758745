//! Restriction configuration, state and phases

use breather_util::{Timestamp, format_countdown};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Opaque token naming an application, category or web domain
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionToken(String);

impl SelectionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SelectionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The set of targets chosen by the user.
///
/// The core never looks inside the tokens; only emptiness and counts matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub applications: BTreeSet<SelectionToken>,
    #[serde(default)]
    pub categories: BTreeSet<SelectionToken>,
    #[serde(default)]
    pub web_domains: BTreeSet<SelectionToken>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.applications.is_empty() && self.categories.is_empty() && self.web_domains.is_empty()
    }

    /// Total number of tokens across all kinds
    pub fn len(&self) -> usize {
        self.applications.len() + self.categories.len() + self.web_domains.len()
    }

    /// Human summary, e.g. "2 apps + 1 category blocked"
    pub fn summary(&self, status_word: &str) -> String {
        let mut parts = Vec::new();

        let apps = self.applications.len();
        if apps > 0 {
            parts.push(format!("{} app{}", apps, if apps == 1 { "" } else { "s" }));
        }
        let categories = self.categories.len();
        if categories > 0 {
            parts.push(format!(
                "{} categor{}",
                categories,
                if categories == 1 { "y" } else { "ies" }
            ));
        }
        let sites = self.web_domains.len();
        if sites > 0 {
            parts.push(format!("{} website{}", sites, if sites == 1 { "" } else { "s" }));
        }

        if parts.is_empty() {
            format!("Nothing {}", status_word)
        } else {
            format!("{} {}", parts.join(" + "), status_word)
        }
    }
}

/// Which lifecycle variant applies when protection is armed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockMode {
    /// Block immediately for the block window
    #[default]
    Instant,
    /// Grant an allowance first, then block
    Delayed,
}

impl BlockMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockMode::Instant => "instant",
            BlockMode::Delayed => "delayed",
        }
    }
}

impl fmt::Display for BlockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instant" => Ok(BlockMode::Instant),
            "delayed" => Ok(BlockMode::Delayed),
            other => Err(format!("unknown block mode '{}'", other)),
        }
    }
}

/// What ends the allowance in Delayed mode.
///
/// Exactly one variant governs a deployment; callbacks belonging to the
/// other one are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayedTrigger {
    /// A one-shot schedule entry fires when the allowance window elapses
    #[default]
    WallClock,
    /// Usage callbacks increment a minute counter up to a threshold
    UsageThreshold,
}

/// Persisted configuration written by the controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionConfig {
    pub selection: Selection,
    pub mode: BlockMode,
    pub enabled: bool,
}

impl RestrictionConfig {
    /// A restriction can only do anything when it is enabled and non-empty
    pub fn is_active(&self) -> bool {
        self.enabled && !self.selection.is_empty()
    }
}

/// Persisted mutable state shared by all contexts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RestrictionState {
    pub block_start_time: Timestamp,
    pub allowance_start_time: Timestamp,
    pub cumulative_usage_minutes: u32,
}

/// Everything a lifecycle decision reads from the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub config: RestrictionConfig,
    pub state: RestrictionState,
    pub setup_completed: bool,
}

/// Lifecycle phase of the restriction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    /// No configuration, nothing selected, or protection disabled
    Idle,
    /// Grace period running, nothing blocked
    Allowance { remaining_secs: u64 },
    /// Restriction applied, countdown running
    Blocking { remaining_secs: u64 },
    /// Countdown elapsed and restriction cleared
    BreakComplete,
}

impl Phase {
    /// Diagnostic label persisted under `delayedBlockPhase`
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Allowance { .. } => "allowance",
            Phase::Blocking { .. } => "blocking",
            Phase::BreakComplete => "break_complete",
        }
    }

    pub fn remaining_secs(&self) -> Option<u64> {
        match self {
            Phase::Allowance { remaining_secs } | Phase::Blocking { remaining_secs } => {
                Some(*remaining_secs)
            }
            Phase::Idle | Phase::BreakComplete => None,
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Phase::Blocking { .. })
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "Protection off"),
            Phase::Allowance { remaining_secs } => {
                write!(f, "Allowance: {} until block", format_countdown(*remaining_secs))
            }
            Phase::Blocking { remaining_secs } => {
                write!(f, "Blocked: {} remaining", format_countdown(*remaining_secs))
            }
            Phase::BreakComplete => write!(f, "Break complete"),
        }
    }
}
