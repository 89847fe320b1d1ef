//! Local cache + shared store pairing.
//!
//! The running session is the source of truth while it runs. At load time
//! the shared store wins only if its record is strictly newer than the one
//! cached locally. Failures on either side are logged and never abort a
//! session.

pub mod conflict_resolver;

pub use conflict_resolver::{decide_merge, reconcile_on_load, resolve_records, MergeDecision};

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::events::PresenceStatus;
use crate::storage::{RecordStore, SessionRecord, UserId};

#[derive(Clone)]
pub struct RecordSync {
    remote: Arc<dyn RecordStore>,
    local: Arc<dyn RecordStore>,
}

impl RecordSync {
    pub fn new(remote: Arc<dyn RecordStore>, local: Arc<dyn RecordStore>) -> Self {
        Self { remote, local }
    }

    /// Load the record a session should start from.
    pub fn load(&self, user: &UserId) -> SessionRecord {
        let local = self.local.load(user).unwrap_or_else(|e| {
            warn!(%user, error = %e, "local cache load failed");
            None
        });
        let remote = self.remote.load(user).unwrap_or_else(|e| {
            warn!(%user, error = %e, "record store load failed; using local state");
            None
        });

        let local_update = local.as_ref().map_or(0, |r| r.last_update);
        let chosen = reconcile_on_load(local, remote);
        if chosen.last_update > local_update {
            debug!(%user, last_update = chosen.last_update, "refreshing local cache from store");
            if let Err(e) = self.local.save(user, &chosen) {
                warn!(%user, error = %e, "local cache refresh failed");
            }
        }
        chosen
    }

    /// Write to the shared store, then mirror into the local cache.
    ///
    /// # Errors
    /// Returns the store error when the shared write fails; the cache is
    /// left untouched in that case.
    pub fn save(&self, user: &UserId, record: &SessionRecord) -> Result<(), StoreError> {
        self.remote.save(user, record)?;
        if let Err(e) = self.local.save(user, record) {
            warn!(%user, error = %e, "local cache write failed");
        }
        Ok(())
    }

    /// Push a presence label to the shared store.
    ///
    /// # Errors
    /// Returns the store error unchanged.
    pub fn set_status(
        &self,
        user: &UserId,
        status: PresenceStatus,
        at_ms: u64,
    ) -> Result<(), StoreError> {
        self.remote.set_status(user, status, at_ms)
    }
}
