//! The focus session controller.
//!
//! Owns one [`SessionState`], the [`IntegrityProbe`] and the user's
//! [`Progress`], and consumes [`Command`]s one at a time. Nothing in here
//! blocks or performs I/O: every outward effect is returned as an [`Event`]
//! for the caller to dispatch.
//!
//! ## Usage
//!
//! ```ignore
//! let mut session = FocusSession::new(user, progress, SessionPolicy::default(), clock);
//! session.handle(Command::SelectDuration { total_minutes: 60 });
//! // Once per second:
//! session.handle(Command::Tick);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::energy::EnergyPolicy;
use crate::events::{CosmeticSlot, Event, SaveReason};
use crate::integrity::{IntegrityPolicy, IntegrityProbe, VisibilityReconciler};
use crate::session::{Phase, SessionPlan, SessionState, TimingPolicy};
use crate::stats::SessionSummary;
use crate::storage::{Progress, SessionRecord, UserId};

/// Inbound messages. Timer, visibility, frame and user sources all funnel
/// into this one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// One countdown second.
    Tick,
    /// Page became hidden.
    Hide,
    /// Page became visible.
    Show,
    /// A rendering frame opportunity.
    Frame,
    SelectDuration { total_minutes: u32 },
    ToggleFocusMode,
    RestartAfterFailure,
    Redeem { cost: u32 },
    Equip {
        slot: CosmeticSlot,
        item: String,
        cost: u32,
    },
}

/// All tunable rules of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPolicy {
    pub timing: TimingPolicy,
    pub energy: EnergyPolicy,
    pub integrity: IntegrityPolicy,
}

impl SessionPolicy {
    pub fn with_timing(mut self, timing: TimingPolicy) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_energy(mut self, energy: EnergyPolicy) -> Self {
        self.energy = energy;
        self
    }

    pub fn with_integrity(mut self, integrity: IntegrityPolicy) -> Self {
        self.integrity = integrity;
        self
    }
}

pub struct FocusSession {
    user: UserId,
    state: SessionState,
    probe: IntegrityProbe,
    progress: Progress,
    policy: SessionPolicy,
    reconciler: VisibilityReconciler,
    clock: Arc<dyn Clock>,
}

impl FocusSession {
    pub fn new(
        user: UserId,
        progress: Progress,
        policy: SessionPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user,
            state: SessionState::default(),
            probe: IntegrityProbe::new(),
            progress,
            policy,
            reconciler: VisibilityReconciler::new(policy.integrity),
            clock,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn probe(&self) -> &IntegrityProbe {
        &self.probe
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn summary(&self) -> SessionSummary {
        self.progress.stats.summarize(self.progress.score)
    }

    /// Snapshot of the persisted part, stamped with the current time.
    pub fn record(&self) -> SessionRecord {
        SessionRecord::new(self.progress.clone(), self.clock.now_ms())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Apply one command. Commands that don't fit the current state return
    /// no events and change nothing.
    pub fn handle(&mut self, command: Command) -> Vec<Event> {
        let now_ms = self.clock.now_ms();
        let at = crate::clock::to_utc(now_ms);

        match command {
            Command::Tick => {
                let events = self.state.tick(&mut self.progress, &self.policy, at);
                // A break that ran out while hidden: the new Work period's
                // hidden interval starts now.
                if self.state.is_hidden()
                    && events.iter().any(|e| matches!(e, Event::WorkStarted { .. }))
                {
                    self.probe.arm(now_ms);
                }
                events
            }
            Command::Frame => {
                self.probe.on_frame(self.state.is_hidden());
                Vec::new()
            }
            Command::Hide => self.reconciler.on_hide(
                &mut self.state,
                &mut self.progress.stats,
                &mut self.probe,
                now_ms,
                at,
            ),
            Command::Show => {
                let mut events = self.reconciler.on_show(
                    &mut self.state,
                    &mut self.progress.stats,
                    &self.policy.energy,
                    &mut self.probe,
                    now_ms,
                    at,
                );
                if !events.is_empty() && self.state.energy().is_depleted() {
                    events.extend(self.state.deplete(&mut self.progress, &self.policy.energy, at));
                }
                events
            }
            Command::SelectDuration { total_minutes } => {
                match SessionPlan::from_minutes(total_minutes, self.policy.timing.period_minutes) {
                    Ok(plan) => self.state.start(plan, &self.policy.timing, at),
                    Err(e) => {
                        warn!(total_minutes, error = %e, "duration selection ignored");
                        Vec::new()
                    }
                }
            }
            Command::ToggleFocusMode => self.state.toggle_focus_mode(at),
            Command::RestartAfterFailure => {
                self.state.restart_after_failure(&self.policy.timing, at)
            }
            Command::Redeem { cost } => match self.progress.score.redeem(cost) {
                Ok(()) => vec![
                    Event::ScoreRedeemed {
                        cost,
                        remaining: self.progress.score.points(),
                        at,
                    },
                    Event::SaveRequested {
                        reason: SaveReason::Redeemed,
                        at,
                    },
                ],
                Err(e) => {
                    debug!(error = %e, "redemption refused");
                    Vec::new()
                }
            },
            Command::Equip { slot, item, cost } => self.equip(slot, item, cost, at),
        }
    }

    fn equip(
        &mut self,
        slot: CosmeticSlot,
        item: String,
        cost: u32,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Vec<Event> {
        if item.trim().is_empty() {
            debug!("equip ignored: empty item");
            return Vec::new();
        }
        if let Err(e) = self.progress.score.redeem(cost) {
            debug!(error = %e, item = %item, "equip refused");
            return Vec::new();
        }
        match slot {
            CosmeticSlot::Skin => self.progress.current_skin = item.clone(),
            CosmeticSlot::Background => self.progress.current_background = item.clone(),
        }
        vec![
            Event::CosmeticEquipped { slot, item, at },
            Event::SaveRequested {
                reason: SaveReason::Equipped,
                at,
            },
        ]
    }
}
