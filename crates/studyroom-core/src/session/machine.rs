//! Transitions of the period state machine.
//!
//! Each transition mutates the owned [`SessionState`] (and the user's
//! [`Progress`] where score or stats change) and returns the events it
//! produced. Invalid transitions return no events and change nothing.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::state::{Mode, SessionPlan, SessionState, TimingPolicy};
use crate::controller::SessionPolicy;
use crate::energy::{Energy, EnergyPolicy};
use crate::events::{Event, SaveReason, StopReason};
use crate::storage::Progress;

impl SessionState {
    /// Enter `Work(1)` for a freshly selected duration.
    ///
    /// Replaces whatever session was running; visibility carries over.
    pub(crate) fn start(
        &mut self,
        plan: SessionPlan,
        timing: &TimingPolicy,
        at: DateTime<Utc>,
    ) -> Vec<Event> {
        let session_id = Uuid::new_v4();
        *self = SessionState {
            session_id: Some(session_id),
            current_period: 1,
            total_periods: plan.total_periods(),
            mode: Mode::Work,
            time_left_secs: timing.work_period_secs,
            energy: Energy::FULL,
            failed: false,
            focus_mode_active: false,
            hidden: self.hidden,
            suspected_cheat: false,
            timer_running: true,
            finished: false,
        };
        info!(%session_id, total_periods = self.total_periods, "session started");
        vec![
            Event::SessionStarted {
                session_id,
                total_periods: self.total_periods,
                at,
            },
            self.timer_started(at),
        ]
    }

    /// One second of countdown.
    ///
    /// Inert while idle, failed or finished. A hidden Work period is inert
    /// too; its hidden time is settled in one step when the page becomes
    /// visible again. A Break keeps running while hidden.
    pub(crate) fn tick(
        &mut self,
        progress: &mut Progress,
        policy: &SessionPolicy,
        at: DateTime<Utc>,
    ) -> Vec<Event> {
        if !self.timer_running || self.failed || (self.hidden && self.mode == Mode::Work) {
            return Vec::new();
        }

        let mut events = Vec::new();
        if self.time_left_secs > 0 {
            self.time_left_secs -= 1;
            if self.mode == Mode::Work {
                progress.stats.total_focus_secs += 1;
                self.energy = policy.energy.after_tick(self.energy);
            }
            events.push(Event::Ticked {
                period: self.current_period,
                mode: self.mode,
                time_left_secs: self.time_left_secs,
                energy: self.energy.value(),
                at,
            });
        }

        if self.time_left_secs == 0 {
            self.end_period(progress, policy, at, &mut events);
        }
        events
    }

    fn end_period(
        &mut self,
        progress: &mut Progress,
        policy: &SessionPolicy,
        at: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) {
        match self.mode {
            Mode::Work => {
                let snapshot = self.energy.floor();
                progress.stats.period_history.push(snapshot);

                let passed = policy.energy.period_passed(self.energy);
                let points_awarded = if passed {
                    progress.score.award(policy.energy.period_bonus);
                    policy.energy.period_bonus
                } else {
                    0
                };
                info!(
                    period = self.current_period,
                    energy = snapshot,
                    points_awarded,
                    "work period completed"
                );
                events.push(Event::PeriodCompleted {
                    period: self.current_period,
                    energy_snapshot: snapshot,
                    points_awarded,
                    at,
                });
                if passed {
                    events.push(Event::SaveRequested {
                        reason: SaveReason::PeriodPassed,
                        at,
                    });
                }

                self.focus_mode_active = false;
                if self.current_period < self.total_periods {
                    self.mode = Mode::Break;
                    self.time_left_secs = policy.timing.break_secs;
                    events.push(Event::BreakStarted {
                        after_period: self.current_period,
                        duration_secs: self.time_left_secs,
                        at,
                    });
                } else {
                    self.finished = true;
                    self.timer_running = false;
                    let summary = progress.stats.summarize(progress.score);
                    info!(
                        average_focus = summary.average_focus,
                        tab_switches = summary.tab_switches,
                        score = summary.score,
                        "session finished"
                    );
                    events.push(Event::SessionFinished { summary, at });
                    events.push(Event::TimerStopped {
                        reason: StopReason::Finished,
                        at,
                    });
                    events.push(Event::SaveRequested {
                        reason: SaveReason::SessionFinished,
                        at,
                    });
                }
            }
            Mode::Break => {
                self.current_period += 1;
                self.mode = Mode::Work;
                self.time_left_secs = policy.timing.work_period_secs;
                self.energy = Energy::FULL;
                self.failed = false;
                self.focus_mode_active = false;
                info!(period = self.current_period, "work period started");
                events.push(Event::WorkStarted {
                    period: self.current_period,
                    duration_secs: self.time_left_secs,
                    at,
                });
            }
        }
    }

    /// Re-enter the current Work period after a failure.
    pub(crate) fn restart_after_failure(
        &mut self,
        timing: &TimingPolicy,
        at: DateTime<Utc>,
    ) -> Vec<Event> {
        if !self.failed {
            debug!("restart ignored: session has not failed");
            return Vec::new();
        }
        self.failed = false;
        self.mode = Mode::Work;
        self.energy = Energy::FULL;
        self.time_left_secs = timing.work_period_secs;
        self.focus_mode_active = false;
        self.suspected_cheat = false;
        self.timer_running = true;
        info!(period = self.current_period, "restarted after failure");
        vec![
            Event::Restarted {
                period: self.current_period,
                at,
            },
            self.timer_started(at),
        ]
    }

    pub(crate) fn toggle_focus_mode(&mut self, at: DateTime<Utc>) -> Vec<Event> {
        if self.mode == Mode::Break || self.failed || !self.timer_running {
            debug!(phase = ?self.phase(), "focus mode toggle ignored");
            return Vec::new();
        }
        self.focus_mode_active = !self.focus_mode_active;
        vec![Event::FocusModeChanged {
            active: self.focus_mode_active,
            at,
        }]
    }

    /// Energy ran out. Applies the depletion penalty at most once per failure.
    pub(crate) fn deplete(
        &mut self,
        progress: &mut Progress,
        policy: &EnergyPolicy,
        at: DateTime<Utc>,
    ) -> Vec<Event> {
        if self.failed || self.mode != Mode::Work || !self.timer_running {
            return Vec::new();
        }
        self.failed = true;
        self.timer_running = false;
        self.focus_mode_active = false;
        progress.score.penalize(policy.depletion_penalty);
        info!(
            period = self.current_period,
            score = progress.score.points(),
            "energy depleted"
        );
        vec![
            Event::EnergyDepleted {
                period: self.current_period,
                points_lost: policy.depletion_penalty,
                score: progress.score.points(),
                at,
            },
            Event::TimerStopped {
                reason: StopReason::Failed,
                at,
            },
            Event::SaveRequested {
                reason: SaveReason::EnergyDepleted,
                at,
            },
        ]
    }

    fn timer_started(&self, at: DateTime<Utc>) -> Event {
        Event::TimerStarted {
            period: self.current_period,
            mode: self.mode,
            time_left_secs: self.time_left_secs,
            at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::to_utc;
    use crate::session::Phase;

    fn at() -> DateTime<Utc> {
        to_utc(0)
    }

    fn started(periods: u32) -> SessionState {
        let mut state = SessionState::default();
        state.start(SessionPlan::periods(periods).unwrap(), &TimingPolicy::default(), at());
        state
    }

    fn run_ticks(state: &mut SessionState, progress: &mut Progress, n: u64) -> Vec<Event> {
        let policy = SessionPolicy::default();
        (0..n).flat_map(|_| state.tick(progress, &policy, at())).collect()
    }

    #[test]
    fn start_enters_first_work_period() {
        let mut state = SessionState::default();
        let events = state.start(SessionPlan::periods(2).unwrap(), &TimingPolicy::default(), at());
        assert_eq!(state.phase(), Phase::Work(1));
        assert_eq!(state.time_left_secs(), 1800);
        assert!(matches!(events[0], Event::SessionStarted { total_periods: 2, .. }));
        assert!(matches!(events[1], Event::TimerStarted { period: 1, .. }));
    }

    #[test]
    fn tick_counts_focus_and_regenerates() {
        let mut state = started(1);
        state.energy = Energy::new(40.0);
        let mut progress = Progress::default();
        run_ticks(&mut state, &mut progress, 10);
        assert_eq!(state.time_left_secs(), 1790);
        assert_eq!(progress.stats.total_focus_secs, 10);
        assert!((state.energy().value() - 43.0).abs() < 1e-9);
    }

    #[test]
    fn idle_and_hidden_ticks_are_inert() {
        let mut idle = SessionState::default();
        let mut progress = Progress::default();
        assert!(run_ticks(&mut idle, &mut progress, 5).is_empty());

        let mut hidden = started(1);
        hidden.hidden = true;
        assert!(run_ticks(&mut hidden, &mut progress, 5).is_empty());
        assert_eq!(hidden.time_left_secs(), 1800);
    }

    #[test]
    fn hidden_break_keeps_counting_down() {
        let mut state = started(2);
        state.mode = Mode::Break;
        state.time_left_secs = 3;
        state.hidden = true;
        let mut progress = Progress::default();

        let events = run_ticks(&mut state, &mut progress, 3);
        assert_eq!(state.phase(), Phase::Work(2));
        assert_eq!(state.time_left_secs(), 1800);
        assert_eq!(progress.stats.total_focus_secs, 0);
        assert!(events.iter().any(|e| matches!(e, Event::WorkStarted { period: 2, .. })));

        assert!(run_ticks(&mut state, &mut progress, 5).is_empty());
        assert_eq!(state.time_left_secs(), 1800);
    }

    #[test]
    fn failing_work_period_awards_nothing() {
        let mut state = started(2);
        state.energy = Energy::new(30.0);
        state.time_left_secs = 1;
        let mut progress = Progress::default();
        // Tick regen lifts 30.0 to 30.3, still below the pass threshold.
        let events = run_ticks(&mut state, &mut progress, 1);
        assert_eq!(progress.stats.period_history, vec![30]);
        assert_eq!(progress.score.points(), 0);
        assert!(!events.iter().any(|e| matches!(e, Event::SaveRequested { .. })));
        assert_eq!(state.phase(), Phase::Break(1));
    }

    #[test]
    fn break_end_starts_next_work_period() {
        let mut state = started(2);
        state.mode = Mode::Break;
        state.time_left_secs = 1;
        state.energy = Energy::new(12.0);
        let mut progress = Progress::default();
        let events = run_ticks(&mut state, &mut progress, 1);
        assert_eq!(state.phase(), Phase::Work(2));
        assert_eq!(state.energy(), Energy::FULL);
        assert_eq!(state.time_left_secs(), 1800);
        assert_eq!(progress.stats.total_focus_secs, 0);
        assert!(matches!(events.last(), Some(Event::WorkStarted { period: 2, .. })));
    }

    #[test]
    fn entering_break_clears_focus_mode() {
        let mut state = started(2);
        state.focus_mode_active = true;
        state.time_left_secs = 1;
        let mut progress = Progress::default();
        run_ticks(&mut state, &mut progress, 1);
        assert_eq!(state.phase(), Phase::Break(1));
        assert!(!state.focus_mode_active());
    }

    #[test]
    fn deplete_applies_penalty_once() {
        let mut state = started(1);
        let mut progress = Progress::default();
        progress.score.award(12);
        let policy = EnergyPolicy::default();

        let events = state.deplete(&mut progress, &policy, at());
        assert_eq!(events.len(), 3);
        assert_eq!(progress.score.points(), 7);
        assert_eq!(state.phase(), Phase::Failed(1));

        assert!(state.deplete(&mut progress, &policy, at()).is_empty());
        assert_eq!(progress.score.points(), 7);
    }

    #[test]
    fn restart_only_from_failure() {
        let mut state = started(3);
        assert!(state.restart_after_failure(&TimingPolicy::default(), at()).is_empty());

        state.current_period = 2;
        state.time_left_secs = 77;
        let mut progress = Progress::default();
        state.deplete(&mut progress, &EnergyPolicy::default(), at());
        let events = state.restart_after_failure(&TimingPolicy::default(), at());
        assert_eq!(events.len(), 2);
        assert_eq!(state.phase(), Phase::Work(2));
        assert_eq!(state.time_left_secs(), 1800);
        assert_eq!(state.energy(), Energy::FULL);
    }

    #[test]
    fn focus_toggle_rejected_in_break_and_failure() {
        let mut state = started(2);
        assert_eq!(state.toggle_focus_mode(at()).len(), 1);
        assert!(state.focus_mode_active());
        state.toggle_focus_mode(at());
        assert!(!state.focus_mode_active());

        state.mode = Mode::Break;
        assert!(state.toggle_focus_mode(at()).is_empty());

        state.mode = Mode::Work;
        state.failed = true;
        assert!(state.toggle_focus_mode(at()).is_empty());
        assert!(!state.focus_mode_active());

        let mut idle = SessionState::default();
        assert!(idle.toggle_focus_mode(at()).is_empty());
    }
}
