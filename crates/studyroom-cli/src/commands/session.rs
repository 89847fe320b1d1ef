//! Session commands: a live run on the wall clock, and a deterministic
//! replay of a script on a manual clock.
//!
//! Both print one JSON object per event on stdout and a final snapshot.
//! Per-second `Ticked` events are left out unless `--ticks` is given.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use serde::Serialize;
use studyroom_core::{
    Command, Config, Event, FocusSession, Input, Level, ManualClock, Phase, Progress,
    SessionDriver, SessionObserver, SessionPlan, SessionState, SessionStats, UserId,
};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{info, warn};

use super::{open_sync, resolve_user, CliResult};

/// Replays start here so event timestamps are stable.
const REPLAY_START_MS: u64 = 1_700_000_000_000;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a session in real time.
    ///
    /// Reads `hide`, `show`, `focus`, `restart` and `quit` lines from stdin.
    Run {
        /// Requested study time; one Work period per `timing.period_minutes`
        #[arg(long)]
        minutes: u32,
        /// User id (defaults to user.id from the config)
        #[arg(long)]
        user: Option<String>,
        /// Simulated frame rate, 0.1 to 1000; 0 disables frames
        #[arg(long, default_value_t = 60.0, value_parser = parse_frame_hz)]
        frame_hz: f64,
        /// Also print per-second tick events
        #[arg(long)]
        ticks: bool,
    },
    /// Replay a script on a manual clock without touching stored records
    Replay {
        /// Script file, one step per line
        script: PathBuf,
        /// Also print per-second tick events
        #[arg(long)]
        ticks: bool,
    },
}

const FRAME_HZ_RANGE: std::ops::RangeInclusive<f64> = 0.1..=1000.0;

fn parse_frame_hz(raw: &str) -> Result<f64, String> {
    let hz: f64 = raw.parse().map_err(|_| format!("'{raw}' is not a number"))?;
    if hz == 0.0 || FRAME_HZ_RANGE.contains(&hz) {
        Ok(hz)
    } else {
        Err(format!(
            "must be 0 or between {} and {}",
            FRAME_HZ_RANGE.start(),
            FRAME_HZ_RANGE.end()
        ))
    }
}

pub fn run(action: SessionAction) -> CliResult {
    match action {
        SessionAction::Run {
            minutes,
            user,
            frame_hz,
            ticks,
        } => run_live(minutes, user, frame_hz, ticks),
        SessionAction::Replay { script, ticks } => {
            let text = std::fs::read_to_string(&script)?;
            let steps = parse_script(&text)?;
            let config = Config::load()?;
            let session = replay(&steps, &config, |event| {
                if ticks || !matches!(event, Event::Ticked { .. }) {
                    print_json(event);
                }
            })?;
            print_json(&Snapshot::of(&session));
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, "could not encode output"),
    }
}

// ── Snapshot ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Snapshot<'a> {
    snapshot: SnapshotBody<'a>,
}

#[derive(Debug, Serialize)]
struct SnapshotBody<'a> {
    user: &'a str,
    #[serde(flatten)]
    phase: Phase,
    time_left: String,
    energy: f64,
    focus_mode: bool,
    hidden: bool,
    score: u32,
    level: Level,
    stats: &'a SessionStats,
    skin: &'a str,
    background: &'a str,
}

impl<'a> Snapshot<'a> {
    fn of(session: &'a FocusSession) -> Self {
        let state = session.state();
        let progress = session.progress();
        Self {
            snapshot: SnapshotBody {
                user: session.user().as_str(),
                phase: state.phase(),
                time_left: state.clock_label(),
                energy: state.energy().value(),
                focus_mode: state.focus_mode_active(),
                hidden: state.is_hidden(),
                score: progress.score.points(),
                level: progress.score.level(),
                stats: &progress.stats,
                skin: &progress.current_skin,
                background: &progress.current_background,
            },
        }
    }
}

// ── Live run ─────────────────────────────────────────────────────────

/// Prints events and asks the driver to stop once the session finishes.
struct JsonObserver {
    ticks: bool,
    shutdown: UnboundedSender<Input>,
}

impl SessionObserver for JsonObserver {
    fn on_transition(&self, _state: &SessionState, events: &[Event]) {
        for event in events {
            if self.ticks || !matches!(event, Event::Ticked { .. }) {
                print_json(event);
            }
            if matches!(event, Event::SessionFinished { .. }) {
                let _ = self.shutdown.send(Input::Shutdown);
            }
        }
    }
}

fn run_live(minutes: u32, user: Option<String>, frame_hz: f64, ticks: bool) -> CliResult {
    let config = Config::load()?;
    SessionPlan::from_minutes(minutes, config.timing.period_minutes)?;
    let user = resolve_user(user, &config)?;
    let sync = open_sync()?;
    let session = super::load_session(user, &config, &sync);
    let tick = Duration::from_millis(config.timing.tick_millis);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let (tx, rx) = mpsc::unbounded_channel();
    let observer = JsonObserver {
        ticks,
        shutdown: tx.clone(),
    };
    let driver = SessionDriver::new(session, sync.clone(), Arc::new(sync), Arc::new(observer), tick);

    let session = runtime.block_on(async move {
        let _ = tx.send(Command::SelectDuration { total_minutes: minutes }.into());
        let frames = (frame_hz > 0.0)
            .then(|| tokio::spawn(frame_ticker(tx.clone(), frame_hz)));
        let stdin = tokio::spawn(read_stdin(tx));

        let session = driver.run(rx).await;
        if let Some(frames) = frames {
            frames.abort();
        }
        stdin.abort();
        session
    });
    // A pending stdin read would otherwise hold the runtime open.
    runtime.shutdown_background();

    print_json(&Snapshot::of(&session));
    Ok(())
}

async fn frame_ticker(tx: UnboundedSender<Input>, hz: f64) {
    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / hz));
    loop {
        interval.tick().await;
        if tx.send(Command::Frame.into()).is_err() {
            break;
        }
    }
}

async fn read_stdin(tx: UnboundedSender<Input>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };
        let input: Input = match line.trim() {
            "" => continue,
            "hide" => Command::Hide.into(),
            "show" => Command::Show.into(),
            "focus" => Command::ToggleFocusMode.into(),
            "restart" => Command::RestartAfterFailure.into(),
            "quit" => break,
            other => {
                warn!(input = other, "unknown input; expected hide, show, focus, restart or quit");
                continue;
            }
        };
        if tx.send(input).is_err() {
            return;
        }
    }
    info!("input closed; stopping session");
    let _ = tx.send(Input::Shutdown);
}

// ── Replay ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Tick(u64),
    Wait(u64),
    Hide,
    Show,
    Frames(u64),
    Focus,
    Restart,
    Select(u32),
    Redeem(u32),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("script line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

/// Parse a replay script. Blank lines and `#` comments are skipped.
pub fn parse_script(text: &str) -> Result<Vec<Step>, ScriptError> {
    let mut steps = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let err = |message: String| ScriptError { line, message };

        let mut words = content.split_whitespace();
        let verb = words.next().unwrap_or_default();
        let arg = words.next();
        if let Some(extra) = words.next() {
            return Err(err(format!("unexpected '{extra}'")));
        }

        let number = |arg: Option<&str>| -> Result<u64, ScriptError> {
            let arg = arg.ok_or_else(|| err(format!("'{verb}' needs a number")))?;
            arg.parse::<u64>()
                .map_err(|_| err(format!("'{arg}' is not a whole number")))
        };
        let small = |arg: Option<&str>| -> Result<u32, ScriptError> {
            let n = number(arg)?;
            u32::try_from(n).map_err(|_| err(format!("{n} is too large")))
        };
        let bare = |step: Step| -> Result<Step, ScriptError> {
            match arg {
                None => Ok(step),
                Some(a) => Err(err(format!("'{verb}' takes no argument, got '{a}'"))),
            }
        };

        let step = match verb {
            "tick" => Step::Tick(match arg {
                None => 1,
                some => number(some)?,
            }),
            "wait" => Step::Wait(number(arg)?),
            "frames" => Step::Frames(number(arg)?),
            "select" => Step::Select(small(arg)?),
            "redeem" => Step::Redeem(small(arg)?),
            "hide" => bare(Step::Hide)?,
            "show" => bare(Step::Show)?,
            "focus" => bare(Step::Focus)?,
            "restart" => bare(Step::Restart)?,
            other => return Err(err(format!("unknown step '{other}'"))),
        };
        steps.push(step);
    }
    Ok(steps)
}

/// Run `steps` against a fresh session on a manual clock.
///
/// Every tick advances the clock one second first; `wait` only moves the
/// clock. Nothing is persisted.
pub fn replay(
    steps: &[Step],
    config: &Config,
    mut emit: impl FnMut(&Event),
) -> Result<FocusSession, studyroom_core::CoreError> {
    let clock = ManualClock::new(REPLAY_START_MS);
    let user = match config.user.id.trim() {
        "" => UserId::new("replay")?,
        id => UserId::new(id)?,
    };
    let mut session = FocusSession::new(
        user,
        Progress::default(),
        config.policy(),
        Arc::new(clock.clone()),
    );

    let mut apply = |session: &mut FocusSession, command: Command| {
        for event in session.handle(command) {
            emit(&event);
        }
    };

    for step in steps {
        match *step {
            Step::Tick(n) => {
                for _ in 0..n {
                    clock.advance_secs(1);
                    apply(&mut session, Command::Tick);
                }
            }
            Step::Wait(secs) => clock.advance_secs(secs),
            Step::Frames(n) => {
                for _ in 0..n {
                    apply(&mut session, Command::Frame);
                }
            }
            Step::Hide => apply(&mut session, Command::Hide),
            Step::Show => apply(&mut session, Command::Show),
            Step::Focus => apply(&mut session, Command::ToggleFocusMode),
            Step::Restart => apply(&mut session, Command::RestartAfterFailure),
            Step::Select(total_minutes) => {
                apply(&mut session, Command::SelectDuration { total_minutes })
            }
            Step::Redeem(cost) => apply(&mut session, Command::Redeem { cost }),
        }
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyroom_core::Verdict;

    #[test]
    fn frame_rate_is_bounded() {
        assert_eq!(parse_frame_hz("0"), Ok(0.0));
        assert_eq!(parse_frame_hz("60"), Ok(60.0));
        assert_eq!(parse_frame_hz("0.1"), Ok(0.1));
        for bad in ["1e-300", "1e9", "-5", "NaN", "inf", "fast"] {
            assert!(parse_frame_hz(bad).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn parses_every_step() {
        let script = "\
# warm up
select 60
tick 30
tick
focus
hide
frames 20   # rendering kept going
wait 10
show
restart
redeem 5
";
        assert_eq!(
            parse_script(script).unwrap(),
            vec![
                Step::Select(60),
                Step::Tick(30),
                Step::Tick(1),
                Step::Focus,
                Step::Hide,
                Step::Frames(20),
                Step::Wait(10),
                Step::Show,
                Step::Restart,
                Step::Redeem(5),
            ]
        );
    }

    #[test]
    fn reports_line_of_bad_step() {
        let err = parse_script("select 30\n\nwait soon\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("soon"));

        let err = parse_script("jump 3").unwrap_err();
        assert_eq!(err.to_string(), "script line 1: unknown step 'jump'");

        assert!(parse_script("hide now").is_err());
        assert!(parse_script("wait").is_err());
        assert!(parse_script("tick 1 2").is_err());
        assert!(parse_script("select 99999999999").is_err());
    }

    #[test]
    fn replay_flags_cheat() {
        let steps = parse_script("select 30\ntick 5\nfocus\nhide\nframes 20\nwait 10\nshow\n").unwrap();
        let mut verdicts = Vec::new();
        let session = replay(&steps, &Config::default(), |e| {
            if let Event::HiddenReconciled { verdict, .. } = e {
                verdicts.push(*verdict);
            }
        })
        .unwrap();

        assert_eq!(verdicts, vec![Verdict::SuspectedCheat]);
        assert_eq!(session.progress().stats.tab_switch_count, 1);
        assert!((session.state().energy().value() - 50.0).abs() < 1e-9);
        assert_eq!(session.state().time_left_secs(), 1785);
    }

    #[test]
    fn replay_uses_configured_policy() {
        let mut config = Config::default();
        config.integrity.max_frames_while_hidden = 50;
        let steps = parse_script("select 30\nfocus\nhide\nframes 20\nwait 10\nshow\n").unwrap();
        let session = replay(&steps, &config, |_| {}).unwrap();
        assert_eq!(session.progress().stats.tab_switch_count, 0);
        assert_eq!(session.progress().stats.total_focus_secs, 10);
    }

    #[test]
    fn snapshot_flattens_phase() {
        let steps = parse_script("select 60\ntick 1800\n").unwrap();
        let session = replay(&steps, &Config::default(), |_| {}).unwrap();
        let value = serde_json::to_value(Snapshot::of(&session)).unwrap();
        assert_eq!(value["snapshot"]["phase"], "break");
        assert_eq!(value["snapshot"]["period"], 1);
        assert_eq!(value["snapshot"]["time_left"], "5:00");
        assert_eq!(value["snapshot"]["score"], 10);
    }
}
