use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{IntegrityPolicy, IntegrityProbe};
use crate::energy::EnergyPolicy;
use crate::events::{Event, PresenceStatus};
use crate::session::{Mode, SessionState};
use crate::stats::SessionStats;

/// How a hidden interval was judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Ordinary background tab; the switch was already counted at hide time.
    Background,
    /// Declared focus mode and the device looked genuinely asleep.
    LegitimateOffline,
    /// Declared focus mode, but rendering kept running.
    SuspectedCheat,
    /// No Work countdown was running; nothing to settle.
    Exempt,
}

/// Judge a hidden interval of a running Work period.
pub fn classify(
    focus_mode_active: bool,
    elapsed_secs: u64,
    frames_while_hidden: u64,
    policy: &IntegrityPolicy,
) -> Verdict {
    if !focus_mode_active {
        return Verdict::Background;
    }
    if elapsed_secs > policy.min_hidden_secs && frames_while_hidden > policy.max_frames_while_hidden
    {
        Verdict::SuspectedCheat
    } else {
        Verdict::LegitimateOffline
    }
}

/// Handles hidden/visible transitions of the page.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibilityReconciler {
    policy: IntegrityPolicy,
}

impl VisibilityReconciler {
    pub fn new(policy: IntegrityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &IntegrityPolicy {
        &self.policy
    }

    /// Visible -> Hidden.
    pub(crate) fn on_hide(
        &self,
        state: &mut SessionState,
        stats: &mut SessionStats,
        probe: &mut IntegrityProbe,
        now_ms: u64,
        at: DateTime<Utc>,
    ) -> Vec<Event> {
        if state.hidden {
            debug!("hide ignored: already hidden");
            return Vec::new();
        }
        probe.arm(now_ms);
        state.hidden = true;

        let status = if state.focus_mode_active {
            PresenceStatus::OnlineHidden
        } else {
            stats.tab_switch_count += 1;
            PresenceStatus::SwitchedAway
        };
        debug!(status = status.label(), "page hidden");
        vec![Event::StatusChanged { status, at }]
    }

    /// Hidden -> Visible. Settles the hidden interval against the countdown,
    /// energy and stats. Depletion is left to the caller.
    pub(crate) fn on_show(
        &self,
        state: &mut SessionState,
        stats: &mut SessionStats,
        energy_policy: &EnergyPolicy,
        probe: &mut IntegrityProbe,
        now_ms: u64,
        at: DateTime<Utc>,
    ) -> Vec<Event> {
        let Some(hidden_since) = probe.take_hidden_since() else {
            debug!("show ignored: no pending hide");
            return Vec::new();
        };
        let elapsed_secs = now_ms.saturating_sub(hidden_since) / 1000;
        let frames = probe.frames_while_hidden();
        state.hidden = false;

        let mut events = Vec::new();
        let exempt = state.failed || state.mode == Mode::Break || !state.timer_running;
        let verdict = if exempt {
            Verdict::Exempt
        } else {
            classify(state.focus_mode_active, elapsed_secs, frames, &self.policy)
        };
        state.suspected_cheat = verdict == Verdict::SuspectedCheat;

        let mut warning = None;
        if !exempt && elapsed_secs > 0 {
            state.time_left_secs = state.time_left_secs.saturating_sub(elapsed_secs);
            match verdict {
                Verdict::SuspectedCheat => {
                    stats.tab_switch_count += 1;
                    let before = state.energy;
                    state.energy = energy_policy.after_cheat(state.energy, elapsed_secs);
                    let energy_lost = before.value() - state.energy.value();
                    warn!(elapsed_secs, frames, energy_lost, "suspected app switch during focus mode");
                    warning = Some(Event::CheatSuspected {
                        elapsed_secs,
                        energy_lost,
                        at,
                    });
                }
                Verdict::LegitimateOffline => {
                    stats.total_focus_secs += elapsed_secs;
                    state.energy = energy_policy.after_offline_focus(state.energy, elapsed_secs);
                }
                Verdict::Background | Verdict::Exempt => {}
            }
        }

        events.push(Event::HiddenReconciled {
            elapsed_secs,
            frames_while_hidden: frames,
            verdict,
            energy: state.energy.value(),
            time_left_secs: state.time_left_secs,
            at,
        });
        events.extend(warning);

        if state.focus_mode_active {
            state.focus_mode_active = false;
            events.push(Event::FocusModeChanged { active: false, at });
        }
        state.suspected_cheat = false;
        events.push(Event::StatusChanged {
            status: PresenceStatus::Online,
            at,
        });
        events
    }
}
