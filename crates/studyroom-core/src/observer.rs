//! Outward hooks: UI refresh and presence status.

use tracing::{debug, warn};

use crate::events::{Event, PresenceStatus};
use crate::session::SessionState;
use crate::storage::UserId;
use crate::sync::RecordSync;

/// Called after every command that changed something.
///
/// The core does not depend on what the observer does with it.
pub trait SessionObserver: Send + Sync {
    fn on_transition(&self, state: &SessionState, events: &[Event]);
}

/// Best-effort presence push. Never reports failure back.
pub trait StatusSink: Send + Sync {
    fn set_status(&self, user: &UserId, status: PresenceStatus, at_ms: u64);
}

/// Observer that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_transition(&self, state: &SessionState, events: &[Event]) {
        debug!(
            phase = ?state.phase(),
            time_left = %state.clock_label(),
            energy = state.energy().value(),
            events = events.len(),
            "session refreshed"
        );
    }
}

impl StatusSink for RecordSync {
    fn set_status(&self, user: &UserId, status: PresenceStatus, at_ms: u64) {
        if let Err(e) = RecordSync::set_status(self, user, status, at_ms) {
            warn!(%user, status = status.label(), error = %e, "status push failed");
        }
    }
}
