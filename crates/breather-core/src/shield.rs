//! Shield content provider
//!
//! Invoked whenever a shielded target is about to render. Every target kind
//! gets the same computation.

use breather_api::{Phase, ShieldContent, ShieldTarget, Snapshot};
use breather_config::LifecycleSettings;
use breather_store::StoreExt;
use breather_util::{Timestamp, format_countdown};
use tracing::{debug, warn};

use crate::{Adapters, shield_render};

/// Labels for a block that is still counting down
pub fn countdown_content(remaining_secs: u64) -> ShieldContent {
    ShieldContent {
        title: "Taking a break".into(),
        subtitle: format!(
            "You can open this again in {}",
            format_countdown(remaining_secs)
        ),
        primary_button: "Okay, I'll wait".into(),
        remaining_secs,
    }
}

/// Labels for a block that just ended
pub fn break_complete_content() -> ShieldContent {
    ShieldContent {
        title: "Break complete".into(),
        subtitle: "Your block has been removed. Close this screen and try again.".into(),
        primary_button: "OK".into(),
        remaining_secs: 0,
    }
}

pub struct ShieldProvider {
    adapters: Adapters,
    settings: LifecycleSettings,
}

impl ShieldProvider {
    pub fn new(adapters: Adapters, settings: LifecycleSettings) -> Self {
        Self { adapters, settings }
    }

    pub fn render(&self, target: &ShieldTarget, now: Timestamp) -> ShieldContent {
        debug!(target = ?target, "Shield render");

        let snapshot = self.adapters.store.load_snapshot().unwrap_or_else(|e| {
            warn!(error = %e, "Shield failed to read restriction state");
            Snapshot::default()
        });

        let decision = shield_render(&snapshot, &self.settings, now);
        if !decision.is_noop() {
            self.adapters.execute(&decision.effects, now);
        }

        match decision.phase {
            Phase::Blocking { remaining_secs } => countdown_content(remaining_secs),
            _ => break_complete_content(),
        }
    }
}
