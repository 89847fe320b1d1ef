//! Last-write-wins reconciliation between the local cache and the store.

use crate::storage::SessionRecord;

/// Which side of a local/remote pair to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    UseLocal,
    UseRemote,
}

/// Remote wins only when strictly newer. Ties keep local.
pub fn decide_merge(local_update_ms: u64, remote_update_ms: u64) -> MergeDecision {
    if remote_update_ms > local_update_ms {
        MergeDecision::UseRemote
    } else {
        MergeDecision::UseLocal
    }
}

/// Resolve two timestamped records.
pub fn resolve_records(local: &SessionRecord, remote: &SessionRecord) -> MergeDecision {
    decide_merge(local.last_update, remote.last_update)
}

/// Pick the record a session should start from.
///
/// Missing sides fall back to the other; with neither, a fresh record.
pub fn reconcile_on_load(
    local: Option<SessionRecord>,
    remote: Option<SessionRecord>,
) -> SessionRecord {
    match (local, remote) {
        (Some(local), Some(remote)) => match resolve_records(&local, &remote) {
            MergeDecision::UseLocal => local,
            MergeDecision::UseRemote => remote,
        },
        (Some(local), None) => local,
        (None, Some(remote)) => remote,
        (None, None) => SessionRecord::default(),
    }
}
