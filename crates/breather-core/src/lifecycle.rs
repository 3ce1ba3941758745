//! Restriction lifecycle state machine
//!
//! Every function here is pure: it reads a [`Snapshot`] of the shared store
//! and a wall-clock `now`, and returns the phase together with the effects
//! that bring the store and the host in line with it. Any context may call
//! any function at any time; repeated or out-of-order calls with
//! non-decreasing `now` converge on the same store contents.

use breather_api::{
    BlockMode, DelayedTrigger, Phase, RestrictionConfig, Selection, SignalReason, Snapshot,
};
use breather_config::LifecycleSettings;
use breather_host_api::{Notice, ScheduleRequest};
use breather_util::{ActivityName, EventName, Timestamp, day_bounds, remaining_secs};
use std::time::Duration;
use tracing::{debug, info};

use crate::{Decision, Effect};

/// Usage granularity of the threshold variant
const USAGE_TICK: Duration = Duration::from_secs(60);

/// Execution context evaluating the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Controller or foreground poller
    Foreground,
    /// Background monitor callback
    Monitor,
    /// Shield content provider
    Shield,
}

impl Origin {
    /// Background contexts report state changes through restart signals
    pub fn is_background(&self) -> bool {
        !matches!(self, Origin::Foreground)
    }
}

fn whole_secs(remaining: i64) -> u64 {
    u64::try_from(remaining).unwrap_or(0)
}

fn is_delayed_with(config: &RestrictionConfig, settings: &LifecycleSettings, trigger: DelayedTrigger) -> bool {
    config.mode == BlockMode::Delayed && settings.delayed_trigger == trigger
}

/// Seconds left in the allowance and the instant a block should be stamped
/// with if it has run out.
fn allowance_remaining(
    snapshot: &Snapshot,
    settings: &LifecycleSettings,
    now: Timestamp,
) -> (i64, Timestamp) {
    let state = &snapshot.state;
    match settings.delayed_trigger {
        DelayedTrigger::WallClock => {
            let grace_end = state.allowance_start_time + settings.allowance;
            (
                remaining_secs(state.allowance_start_time, settings.allowance, now),
                now.min(grace_end),
            )
        }
        DelayedTrigger::UsageThreshold => {
            let left = settings
                .usage_threshold_minutes
                .saturating_sub(state.cumulative_usage_minutes);
            (i64::from(left) * USAGE_TICK.as_secs() as i64, now)
        }
    }
}

/// Effects that end a block: clear the engine, unset the block and stop
/// the intervals tied to it.
fn end_block(origin: Origin, notify: bool) -> Vec<Effect> {
    let mut effects = vec![
        Effect::ClearShield,
        Effect::SetBlockStart(Timestamp::ZERO),
        Effect::SetPhaseLabel(Phase::BreakComplete.label()),
        Effect::CancelSchedules(ActivityName::all()),
    ];
    if notify {
        effects.push(Effect::Notify(Notice::break_complete()));
    }
    if origin.is_background() {
        effects.push(Effect::PostSignal(SignalReason::BreakCompleted));
    }
    effects
}

/// Convert an allowance into a block stamped at `block_start`.
///
/// If the whole block already elapsed by `now` nothing is applied and the
/// restriction goes straight to BreakComplete.
fn begin_block(
    selection: &Selection,
    settings: &LifecycleSettings,
    block_start: Timestamp,
    now: Timestamp,
    origin: Origin,
    reason: SignalReason,
    mut effects: Vec<Effect>,
) -> Decision {
    let remaining = remaining_secs(block_start, settings.block, now);

    if remaining <= 0 {
        info!(block_start = %block_start, now = %now, "Block elapsed before it was observed");
        effects.push(Effect::SetAllowanceStart(Timestamp::ZERO));
        effects.extend(end_block(origin, false));
        return Decision::new(Phase::BreakComplete, effects);
    }

    info!(block_start = %block_start, remaining_secs = remaining, origin = ?origin, "Block started");
    let phase = Phase::Blocking {
        remaining_secs: whole_secs(remaining),
    };
    effects.extend([
        Effect::ApplyShield(selection.clone()),
        Effect::SetBlockStart(block_start),
        Effect::SetAllowanceStart(Timestamp::ZERO),
        Effect::SetPhaseLabel(phase.label()),
    ]);
    if origin.is_background() {
        effects.push(Effect::PostSignal(reason));
    }

    Decision::new(phase, effects)
}

/// The single authoritative transition function.
///
/// The allowance is checked before the block. When both timestamps are set
/// the later one wins and the other is cleared.
pub fn update_phase(
    snapshot: &Snapshot,
    settings: &LifecycleSettings,
    now: Timestamp,
    origin: Origin,
) -> Decision {
    if !snapshot.config.is_active() {
        return Decision::settled(Phase::Idle);
    }

    let state = &snapshot.state;
    let mut effects = Vec::new();

    if state.allowance_start_time.is_set() {
        if state.block_start_time.is_set() && state.block_start_time >= state.allowance_start_time {
            debug!("Block supersedes allowance");
            effects.push(Effect::SetAllowanceStart(Timestamp::ZERO));
        } else {
            if state.block_start_time.is_set() {
                debug!(block_start = %state.block_start_time, "Clearing stale block");
                effects.push(Effect::SetBlockStart(Timestamp::ZERO));
            }

            let (remaining, block_start) = allowance_remaining(snapshot, settings, now);
            if remaining > 0 {
                return Decision::new(
                    Phase::Allowance {
                        remaining_secs: whole_secs(remaining),
                    },
                    effects,
                );
            }

            return begin_block(
                &snapshot.config.selection,
                settings,
                block_start,
                now,
                origin,
                SignalReason::BlockStarted,
                effects,
            );
        }
    }

    if state.block_start_time.is_set() {
        let remaining = remaining_secs(state.block_start_time, settings.block, now);
        if remaining > 0 {
            return Decision::new(
                Phase::Blocking {
                    remaining_secs: whole_secs(remaining),
                },
                effects,
            );
        }

        info!(block_start = %state.block_start_time, origin = ?origin, "Block complete");
        effects.extend(end_block(origin, true));
        return Decision::new(Phase::BreakComplete, effects);
    }

    Decision::new(Phase::BreakComplete, effects)
}

/// Start protection in the configured mode. Always clears the engine and
/// cancels existing intervals first.
pub fn arm(snapshot: &Snapshot, settings: &LifecycleSettings, now: Timestamp) -> Decision {
    let config = &snapshot.config;
    if !config.is_active() {
        return Decision::settled(Phase::Idle);
    }

    let mut effects = vec![
        Effect::ClearShield,
        Effect::CancelSchedules(ActivityName::all()),
    ];
    let (day_start, day_end) = day_bounds(now);

    match config.mode {
        BlockMode::Instant => {
            let phase = Phase::Blocking {
                remaining_secs: settings.block.as_secs(),
            };
            effects.extend([
                Effect::ApplyShield(config.selection.clone()),
                Effect::SetBlockStart(now),
                Effect::SetAllowanceStart(Timestamp::ZERO),
                Effect::SetUsageMinutes(0),
                Effect::ArmSchedule(ScheduleRequest::daily(
                    ActivityName::protection(),
                    day_start,
                    day_end,
                )),
                Effect::SetPhaseLabel(phase.label()),
            ]);
            Decision::new(phase, effects)
        }
        BlockMode::Delayed => {
            let (request, remaining) = match settings.delayed_trigger {
                DelayedTrigger::WallClock => {
                    let start = now + settings.allowance;
                    (
                        ScheduleRequest::one_shot(
                            ActivityName::delayed_block(),
                            start,
                            start + settings.block,
                        ),
                        settings.allowance.as_secs(),
                    )
                }
                DelayedTrigger::UsageThreshold => (
                    ScheduleRequest::daily(ActivityName::protection(), day_start, day_end)
                        .with_usage_threshold(USAGE_TICK),
                    u64::from(settings.usage_threshold_minutes) * USAGE_TICK.as_secs(),
                ),
            };

            let phase = Phase::Allowance {
                remaining_secs: remaining,
            };
            effects.extend([
                Effect::SetAllowanceStart(now),
                Effect::SetBlockStart(Timestamp::ZERO),
                Effect::SetUsageMinutes(0),
                Effect::ArmSchedule(request),
                Effect::SetPhaseLabel(phase.label()),
            ]);
            Decision::new(phase, effects)
        }
    }
}

/// Stop protection. Keeps the selection, turns the enable flag off.
pub fn disarm() -> Decision {
    Decision::new(
        Phase::Idle,
        vec![
            Effect::CancelSchedules(ActivityName::all()),
            Effect::ClearShield,
            Effect::SetAllowanceStart(Timestamp::ZERO),
            Effect::SetBlockStart(Timestamp::ZERO),
            Effect::SetUsageMinutes(0),
            Effect::SetEnabled(false),
            Effect::SetPhaseLabel(Phase::Idle.label()),
        ],
    )
}

/// Interval-start callback. Returns `None` when the callback does not apply
/// to the current configuration or was already acted on.
pub fn interval_started(
    snapshot: &Snapshot,
    settings: &LifecycleSettings,
    activity: &ActivityName,
    now: Timestamp,
) -> Option<Decision> {
    if *activity != ActivityName::delayed_block() {
        debug!(activity = %activity, "Interval start for unrelated activity");
        return None;
    }

    let config = &snapshot.config;
    if !config.is_active() || !is_delayed_with(config, settings, DelayedTrigger::WallClock) {
        debug!(activity = %activity, "Interval start ignored, wall-clock delay not armed");
        return None;
    }

    let state = &snapshot.state;
    if !state.allowance_start_time.is_set() || state.block_start_time.is_set() {
        debug!("Interval start ignored, allowance already converted");
        return None;
    }

    let block_start = now.min(state.allowance_start_time + settings.allowance);
    Some(begin_block(
        &config.selection,
        settings,
        block_start,
        now,
        Origin::Monitor,
        SignalReason::BlockStarted,
        Vec::new(),
    ))
}

/// Usage threshold callback for the threshold variant: one call per
/// elapsed usage minute.
pub fn threshold_reached(
    snapshot: &Snapshot,
    settings: &LifecycleSettings,
    activity: &ActivityName,
    event: &EventName,
    now: Timestamp,
) -> Option<Decision> {
    if *activity != ActivityName::protection() || *event != EventName::threshold_reached() {
        debug!(activity = %activity, event = %event, "Threshold callback for unrelated event");
        return None;
    }

    let config = &snapshot.config;
    if !config.is_active() || !is_delayed_with(config, settings, DelayedTrigger::UsageThreshold) {
        debug!("Threshold callback ignored, usage threshold not armed");
        return None;
    }

    let state = &snapshot.state;
    if state.block_start_time.is_set() || !state.allowance_start_time.is_set() {
        debug!("Threshold callback ignored outside allowance");
        return None;
    }

    let used = state.cumulative_usage_minutes.saturating_add(1);
    let limit = settings.usage_threshold_minutes;
    if used < limit {
        debug!(used, limit, "Usage counted");
        return Some(Decision::new(
            Phase::Allowance {
                remaining_secs: u64::from(limit - used) * USAGE_TICK.as_secs(),
            },
            vec![Effect::SetUsageMinutes(used)],
        ));
    }

    info!(used, limit, "Usage threshold reached");
    Some(begin_block(
        &config.selection,
        settings,
        now,
        now,
        Origin::Monitor,
        SignalReason::ThresholdReached,
        vec![Effect::SetUsageMinutes(0)],
    ))
}

/// Evaluation for a shield about to render.
///
/// An unset block start reads as a block that just began. An elapsed block
/// is ended here; the surface being rendered still shows the shield.
pub fn shield_render(snapshot: &Snapshot, settings: &LifecycleSettings, now: Timestamp) -> Decision {
    let block_start = snapshot.state.block_start_time;
    if !block_start.is_set() {
        return Decision::settled(Phase::Blocking {
            remaining_secs: settings.block.as_secs(),
        });
    }

    let remaining = remaining_secs(block_start, settings.block, now);
    if remaining > 0 {
        return Decision::settled(Phase::Blocking {
            remaining_secs: whole_secs(remaining),
        });
    }

    info!(block_start = %block_start, "Block complete at shield render");
    Decision::new(Phase::BreakComplete, end_block(Origin::Shield, true))
}

/// Effects that wipe restrictions left behind by an earlier install.
/// Only applies before setup has ever completed and while protection is off.
pub fn cleanup_orphans(snapshot: &Snapshot) -> Option<Vec<Effect>> {
    if snapshot.setup_completed || snapshot.config.enabled {
        return None;
    }

    Some(vec![
        Effect::ClearShield,
        Effect::SetBlockStart(Timestamp::ZERO),
        Effect::SetAllowanceStart(Timestamp::ZERO),
        Effect::SetUsageMinutes(0),
        Effect::SetPhaseLabel(Phase::Idle.label()),
    ])
}
