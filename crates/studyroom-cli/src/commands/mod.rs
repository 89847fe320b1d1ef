pub mod config;
pub mod profile;
pub mod session;
pub mod stats;

use std::sync::Arc;

use studyroom_core::{
    Command, Config, CoreError, Database, Event, FocusSession, RecordSync, SystemClock, UserId,
};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// `--user` wins over `user.id` from the config file.
pub fn resolve_user(flag: Option<String>, config: &Config) -> Result<UserId, CoreError> {
    UserId::new(flag.unwrap_or_else(|| config.user.id.clone()))
}

/// Shared record store plus local cache, both in the data directory.
pub fn open_sync() -> Result<RecordSync, CoreError> {
    let remote = Database::open_records()?;
    let local = Database::open_cache()?;
    Ok(RecordSync::new(Arc::new(remote), Arc::new(local)))
}

/// A session over the user's reconciled record on the wall clock.
pub fn load_session(user: UserId, config: &Config, sync: &RecordSync) -> FocusSession {
    let record = sync.load(&user);
    FocusSession::new(user, record.progress, config.policy(), Arc::new(SystemClock))
}

/// Apply one command outside the driver and save synchronously when it asks.
///
/// Returns the events; an empty list means the command was refused.
pub fn apply_and_save(
    session: &mut FocusSession,
    sync: &RecordSync,
    command: Command,
) -> Result<Vec<Event>, CoreError> {
    let events = session.handle(command);
    if events
        .iter()
        .any(|e| matches!(e, Event::SaveRequested { .. }))
    {
        sync.save(session.user(), &session.record())?;
    }
    Ok(events)
}
