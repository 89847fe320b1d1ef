use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::record::{SessionRecord, UserId};
use crate::error::StoreError;
use crate::events::PresenceStatus;

/// Document store keyed by user.
///
/// Implementations must be callable from the blocking pool; the session
/// driver never waits on them.
pub trait RecordStore: Send + Sync {
    /// Load the user's record. `Ok(None)` when the user has no document.
    fn load(&self, user: &UserId) -> Result<Option<SessionRecord>, StoreError>;

    /// Overwrite the user's record.
    fn save(&self, user: &UserId, record: &SessionRecord) -> Result<(), StoreError>;

    /// Record a presence label. Stores that don't track presence ignore it.
    fn set_status(
        &self,
        _user: &UserId,
        _status: PresenceStatus,
        _at_ms: u64,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

/// In-process store, useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<UserId, SessionRecord>>,
    statuses: Mutex<Vec<(UserId, PresenceStatus, u64)>>,
    reject_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(user: &UserId, record: SessionRecord) -> Self {
        let store = Self::new();
        store.insert(user, record);
        store
    }

    pub fn insert(&self, user: &UserId, record: SessionRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.insert(user.clone(), record);
        }
    }

    pub fn get(&self, user: &UserId) -> Option<SessionRecord> {
        self.records.lock().ok()?.get(user).cloned()
    }

    /// Make every subsequent save fail with [`StoreError::Rejected`].
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn statuses(&self) -> Vec<(UserId, PresenceStatus, u64)> {
        self.statuses
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, user: &UserId) -> Result<Option<SessionRecord>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::QueryFailed("memory store poisoned".into()))?;
        Ok(records.get(user).cloned())
    }

    fn save(&self, user: &UserId, record: &SessionRecord) -> Result<(), StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("writes disabled".into()));
        }
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::QueryFailed("memory store poisoned".into()))?;
        records.insert(user.clone(), record.clone());
        Ok(())
    }

    fn set_status(&self, user: &UserId, status: PresenceStatus, at_ms: u64) -> Result<(), StoreError> {
        let mut statuses = self
            .statuses
            .lock()
            .map_err(|_| StoreError::QueryFailed("memory store poisoned".into()))?;
        statuses.push((user.clone(), status, at_ms));
        Ok(())
    }
}
