//! Event loop around [`FocusSession`].
//!
//! The countdown, frame and visibility sources run independently but every
//! one of them is turned into a [`Command`] and applied on a single task, one
//! at a time. Record saves and status pushes are queued to one writer task,
//! which applies them on the blocking pool in the order they were produced.
//! The loop never waits on it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::controller::{Command, FocusSession};
use crate::events::{Event, PresenceStatus};
use crate::observer::{SessionObserver, StatusSink};
use crate::storage::{SessionRecord, UserId};
use crate::sync::RecordSync;

/// Messages accepted by [`SessionDriver::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Command(Command),
    Shutdown,
}

impl From<Command> for Input {
    fn from(command: Command) -> Self {
        Input::Command(command)
    }
}

/// At most one repeating countdown interval.
///
/// Starting replaces the previous interval, so two countdowns can never
/// decrement the same session.
#[derive(Debug)]
pub struct Countdown {
    period: Duration,
    interval: Option<Interval>,
}

impl Countdown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    pub fn stop(&mut self) {
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Resolves on the next tick. Never resolves while stopped.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// One queued write for the persistence worker.
#[derive(Debug)]
enum Write {
    Record { user: UserId, record: SessionRecord },
    Status { user: UserId, status: PresenceStatus, at_ms: u64 },
}

/// Drains the queue until every sender is gone. Each write finishes on the
/// blocking pool before the next one starts, so an older record can never
/// overwrite a newer one.
async fn write_in_order(
    mut queue: UnboundedReceiver<Write>,
    sync: RecordSync,
    sink: Arc<dyn StatusSink>,
) {
    while let Some(write) = queue.recv().await {
        let sync = sync.clone();
        let sink = Arc::clone(&sink);
        let done = tokio::task::spawn_blocking(move || match write {
            Write::Record { user, record } => match sync.save(&user, &record) {
                Ok(()) => debug!(%user, last_update = record.last_update, "record saved"),
                Err(e) => warn!(%user, error = %e, "record save failed; keeping local state"),
            },
            Write::Status { user, status, at_ms } => sink.set_status(&user, status, at_ms),
        })
        .await;
        if let Err(e) = done {
            warn!(error = %e, "persistence write panicked");
        }
    }
}

pub struct SessionDriver {
    session: FocusSession,
    persistence: RecordSync,
    status: Arc<dyn StatusSink>,
    observer: Arc<dyn SessionObserver>,
    countdown: Countdown,
    writer: Option<UnboundedSender<Write>>,
    background: JoinSet<()>,
}

impl SessionDriver {
    pub fn new(
        session: FocusSession,
        persistence: RecordSync,
        status: Arc<dyn StatusSink>,
        observer: Arc<dyn SessionObserver>,
        tick: Duration,
    ) -> Self {
        Self {
            session,
            persistence,
            status,
            observer,
            countdown: Countdown::new(tick),
            writer: None,
            background: JoinSet::new(),
        }
    }

    pub fn session(&self) -> &FocusSession {
        &self.session
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    /// Apply one command and dispatch what it produced.
    pub fn apply(&mut self, command: Command) -> Vec<Event> {
        let events = self.session.handle(command);
        self.dispatch(&events);
        events
    }

    fn dispatch(&mut self, events: &[Event]) {
        if events.is_empty() {
            return;
        }

        let mut save = false;
        for event in events {
            match event {
                Event::TimerStarted { .. } => self.countdown.start(),
                Event::TimerStopped { .. } => self.countdown.stop(),
                Event::StatusChanged { status, .. } => self.push_status(*status),
                Event::SaveRequested { .. } => save = true,
                _ => {}
            }
        }
        if save {
            self.queue_save();
        }

        self.observer.on_transition(self.session.state(), events);
        self.reap();
    }

    fn queue_save(&mut self) {
        let user = self.session.user().clone();
        let record = self.session.record();
        self.enqueue(Write::Record { user, record });
    }

    fn push_status(&mut self, status: PresenceStatus) {
        let user = self.session.user().clone();
        let at_ms = self.session.now_ms();
        self.enqueue(Write::Status { user, status, at_ms });
    }

    /// Hand a write to the worker, starting it on first use.
    fn enqueue(&mut self, write: Write) {
        if self.writer.as_ref().map_or(true, UnboundedSender::is_closed) {
            let (tx, rx) = mpsc::unbounded_channel();
            let sync = self.persistence.clone();
            let sink = Arc::clone(&self.status);
            self.background.spawn(write_in_order(rx, sync, sink));
            self.writer = Some(tx);
        }
        if let Some(writer) = &self.writer {
            if let Err(e) = writer.send(write) {
                warn!(write = ?e.0, "persistence worker stopped; write dropped");
            }
        }
    }

    fn reap(&mut self) {
        while let Some(result) = self.background.try_join_next() {
            if let Err(e) = result {
                warn!(error = %e, "background persistence task failed");
            }
        }
    }

    /// Consume inputs until `Shutdown` or the sender is dropped.
    ///
    /// Returns the session so callers can inspect or persist the final state.
    pub async fn run(mut self, mut inputs: UnboundedReceiver<Input>) -> FocusSession {
        info!(user = %self.session.user(), "session driver started");
        loop {
            tokio::select! {
                _ = self.countdown.tick() => {
                    self.apply(Command::Tick);
                }
                input = inputs.recv() => match input {
                    Some(Input::Command(command)) => {
                        self.apply(command);
                    }
                    Some(Input::Shutdown) | None => break,
                },
            }
        }
        self.shutdown().await
    }

    /// Stop the countdown and wait for outstanding writes.
    pub async fn shutdown(mut self) -> FocusSession {
        self.countdown.stop();
        self.writer = None;
        while let Some(result) = self.background.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "background persistence task failed");
            }
        }
        info!(user = %self.session.user(), "session driver stopped");
        self.session
    }
}
