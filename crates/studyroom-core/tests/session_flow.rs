//! End-to-end flows through the controller with a manual clock.

use std::sync::Arc;

use studyroom_core::{
    Command, Energy, EnergyPolicy, Event, FocusSession, Level, ManualClock, Mode, Phase,
    Progress, SaveReason, Score, SessionPolicy, UserId, Verdict,
};

const START_MS: u64 = 1_700_000_000_000;

fn session(score: u32) -> (FocusSession, ManualClock) {
    let clock = ManualClock::new(START_MS);
    let mut progress = Progress::default();
    progress.score = Score::new(score);
    let session = FocusSession::new(
        UserId::new("student-1").unwrap(),
        progress,
        SessionPolicy::default(),
        Arc::new(clock.clone()),
    );
    (session, clock)
}

fn tick_n(session: &mut FocusSession, clock: &ManualClock, n: u64) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..n {
        clock.advance_secs(1);
        events.extend(session.handle(Command::Tick));
    }
    events
}

/// Hide with focus mode on, render `frames` frames, stay away `secs`, show.
fn focused_absence(
    session: &mut FocusSession,
    clock: &ManualClock,
    secs: u64,
    frames: u32,
) -> Vec<Event> {
    if !session.state().focus_mode_active() {
        session.handle(Command::ToggleFocusMode);
    }
    session.handle(Command::Hide);
    for _ in 0..frames {
        session.handle(Command::Frame);
    }
    clock.advance_secs(secs);
    session.handle(Command::Show)
}

#[test]
fn clean_work_period_awards_bonus_and_enters_break() {
    let (mut s, clock) = session(0);
    s.handle(Command::SelectDuration { total_minutes: 60 });

    let events = tick_n(&mut s, &clock, 1800);

    assert_eq!(s.phase(), Phase::Break(1));
    assert_eq!(s.state().time_left_secs(), 300);
    assert_eq!(s.progress().stats.period_history, vec![100]);
    assert_eq!(s.progress().stats.total_focus_secs, 1800);
    assert_eq!(s.progress().score.points(), 10);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::PeriodCompleted { period: 1, energy_snapshot: 100, points_awarded: 10, .. }
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::BreakStarted { after_period: 1, duration_secs: 300, .. })));

    // Break does not count as focus time.
    tick_n(&mut s, &clock, 300);
    assert_eq!(s.phase(), Phase::Work(2));
    assert_eq!(s.state().time_left_secs(), 1800);
    assert_eq!(s.state().energy(), Energy::FULL);
    assert_eq!(s.progress().stats.total_focus_secs, 1800);
}

#[test]
fn repeated_cheats_fail_the_period_until_restart() {
    let (mut s, clock) = session(3);
    s.handle(Command::SelectDuration { total_minutes: 30 });
    tick_n(&mut s, &clock, 10);

    let mut failed_on = None;
    for attempt in 1..=5 {
        let events = focused_absence(&mut s, &clock, 6, 16);
        assert!(events.iter().any(|e| matches!(
            e,
            Event::HiddenReconciled { verdict: Verdict::SuspectedCheat, .. }
        )));
        if s.state().is_failed() {
            failed_on = Some(attempt);
            break;
        }
    }

    // 6 s at 5/s drains 30 per attempt, so the fourth empties the bar.
    assert_eq!(failed_on, Some(4));
    assert_eq!(s.phase(), Phase::Failed(1));
    assert_eq!(s.progress().score.points(), 0);
    assert_eq!(s.progress().stats.tab_switch_count, 4);

    let frozen = s.state().time_left_secs();
    assert!(tick_n(&mut s, &clock, 30).is_empty());
    assert_eq!(s.state().time_left_secs(), frozen);

    s.handle(Command::RestartAfterFailure);
    assert_eq!(s.phase(), Phase::Work(1));
    assert_eq!(s.state().time_left_secs(), 1800);
    tick_n(&mut s, &clock, 1);
    assert_eq!(s.state().time_left_secs(), 1799);
}

#[test]
fn single_cheat_costs_energy_and_time() {
    let (mut s, clock) = session(0);
    s.handle(Command::SelectDuration { total_minutes: 30 });
    tick_n(&mut s, &clock, 100);
    let switches = s.progress().stats.tab_switch_count;

    let events = focused_absence(&mut s, &clock, 10, 20);

    assert_eq!(s.progress().stats.tab_switch_count, switches + 1);
    assert!((s.state().energy().value() - 50.0).abs() < 1e-9);
    assert_eq!(s.state().time_left_secs(), 1690);
    assert!(!s.state().focus_mode_active());
    assert!(events.iter().any(Event::is_warning));
    assert_eq!(s.phase(), Phase::Work(1));
}

#[test]
fn legitimate_offline_focus_counts_as_study() {
    let (mut s, clock) = session(0);
    s.handle(Command::SelectDuration { total_minutes: 30 });

    let events = focused_absence(&mut s, &clock, 120, 3);

    assert!(events.iter().any(|e| matches!(
        e,
        Event::HiddenReconciled { verdict: Verdict::LegitimateOffline, elapsed_secs: 120, .. }
    )));
    assert_eq!(s.progress().stats.total_focus_secs, 120);
    assert_eq!(s.progress().stats.tab_switch_count, 0);
    assert_eq!(s.state().time_left_secs(), 1680);
    assert_eq!(s.state().energy(), Energy::FULL);
}

#[test]
fn background_switch_counts_once_and_keeps_energy() {
    let (mut s, clock) = session(0);
    s.handle(Command::SelectDuration { total_minutes: 30 });
    tick_n(&mut s, &clock, 5);

    s.handle(Command::Hide);
    for _ in 0..200 {
        s.handle(Command::Frame);
    }
    clock.advance_secs(40);
    s.handle(Command::Show);

    assert_eq!(s.progress().stats.tab_switch_count, 1);
    assert_eq!(s.progress().stats.total_focus_secs, 5);
    assert_eq!(s.state().time_left_secs(), 1755);
    assert_eq!(s.state().energy(), Energy::FULL);
}

#[test]
fn six_passing_periods_finish_the_session() {
    let (mut s, clock) = session(0);
    s.handle(Command::SelectDuration { total_minutes: 180 });
    assert_eq!(s.state().total_periods(), 6);

    let mut finished = None;
    for _ in 0..6 {
        let events = tick_n(&mut s, &clock, 1800);
        finished = events.into_iter().find_map(|e| match e {
            Event::SessionFinished { summary, .. } => Some(summary),
            _ => None,
        });
        if finished.is_none() {
            tick_n(&mut s, &clock, 300);
        }
    }

    let summary = finished.expect("session should finish after the sixth period");
    assert_eq!(s.phase(), Phase::Finished);
    assert!(!s.state().timer_running());
    assert_eq!(summary.periods_completed, 6);
    assert_eq!(summary.average_focus, 100.0);
    assert_eq!(summary.score, 60);
    assert_eq!(summary.level, Level::Three);
    assert_eq!(s.progress().stats.total_focus_secs, 6 * 1800);

    // Finished is terminal for ticks.
    assert!(tick_n(&mut s, &clock, 10).is_empty());
}

#[test]
fn failing_period_records_snapshot_without_bonus() {
    let clock = ManualClock::new(START_MS);
    let policy = SessionPolicy::default().with_energy(EnergyPolicy {
        tick_regen: 0.0,
        ..EnergyPolicy::default()
    });
    let mut s = FocusSession::new(
        UserId::new("student-2").unwrap(),
        Progress::default(),
        policy,
        Arc::new(clock.clone()),
    );
    s.handle(Command::SelectDuration { total_minutes: 30 });

    // Two 6 s cheats drain 60 and nothing regenerates.
    focused_absence(&mut s, &clock, 6, 16);
    focused_absence(&mut s, &clock, 6, 16);
    assert!((s.state().energy().value() - 40.0).abs() < 1e-9);

    let remaining = s.state().time_left_secs();
    let events = tick_n(&mut s, &clock, remaining);

    assert_eq!(s.phase(), Phase::Finished);
    assert_eq!(s.progress().stats.period_history, vec![40]);
    assert_eq!(s.progress().score.points(), 0);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::PeriodCompleted { energy_snapshot: 40, points_awarded: 0, .. }
    )));
    assert!(!events
        .iter()
        .any(|e| matches!(e, Event::SaveRequested { reason: SaveReason::PeriodPassed, .. })));
}

#[test]
fn focus_mode_cannot_be_enabled_during_break() {
    let (mut s, clock) = session(0);
    s.handle(Command::SelectDuration { total_minutes: 60 });
    s.handle(Command::ToggleFocusMode);
    assert!(s.state().focus_mode_active());

    tick_n(&mut s, &clock, 1800);
    assert_eq!(s.state().mode(), Mode::Break);
    assert!(!s.state().focus_mode_active());
    assert!(s.handle(Command::ToggleFocusMode).is_empty());
    assert!(!s.state().focus_mode_active());
}

#[test]
fn hidden_break_still_runs_down() {
    let (mut s, clock) = session(0);
    s.handle(Command::SelectDuration { total_minutes: 60 });
    tick_n(&mut s, &clock, 1800);
    assert_eq!(s.state().phase(), Phase::Break(1));

    s.handle(Command::Hide);
    for _ in 0..100 {
        s.handle(Command::Frame);
    }
    tick_n(&mut s, &clock, 60);
    let events = s.handle(Command::Show);

    assert!(events.iter().any(|e| matches!(
        e,
        Event::HiddenReconciled { verdict: Verdict::Exempt, .. }
    )));
    assert_eq!(s.state().phase(), Phase::Break(1));
    assert_eq!(s.state().time_left_secs(), 240);
    assert_eq!(s.state().energy(), Energy::FULL);
}

#[test]
fn break_that_ends_while_hidden_starts_next_period() {
    let (mut s, clock) = session(0);
    s.handle(Command::SelectDuration { total_minutes: 60 });
    tick_n(&mut s, &clock, 1800);
    let switches = s.progress().stats.tab_switch_count;

    s.handle(Command::Hide);
    let events = tick_n(&mut s, &clock, 600);
    assert!(events.iter().any(|e| matches!(e, Event::WorkStarted { period: 2, .. })));
    let events = s.handle(Command::Show);

    // Only the 300s hidden inside Work(2) come off its countdown.
    assert_eq!(s.state().phase(), Phase::Work(2));
    assert_eq!(s.state().time_left_secs(), 1500);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::HiddenReconciled { verdict: Verdict::Background, elapsed_secs: 300, .. }
    )));
    assert_eq!(s.progress().stats.tab_switch_count, switches + 1);
}
