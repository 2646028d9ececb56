// ── Poll result application ──
//
// Merges poll results into existing aggregates. Details and configuration
// overwrite; the open state only fills a gap, because a push event that
// already set `locked` is fresher than anything a poll can report.

use tracing::debug;
use ttlock_api::models::OpenState;

use super::LockStore;
use crate::model::{LockId, LockInfo, LockState, PassageModeConfig};

/// `Some(true)` locked, `Some(false)` unlocked, `None` unknown.
pub(crate) fn open_state_to_locked(state: OpenState) -> Option<bool> {
    match state.state {
        OpenState::LOCKED => Some(true),
        OpenState::UNLOCKED => Some(false),
        _ => None,
    }
}

/// Overwrite every poll-authoritative attribute. Identity never changes.
pub(crate) fn merge_info(state: &mut LockState, info: LockInfo) {
    state.name = info.name;
    state.lock_type = info.lock_type;
    state.model = info.model;
    state.battery_level = info.battery_level;
    state.hardware_version = info.hardware_version;
    state.firmware_version = info.firmware_version;
    state.features = info.features;
    state.has_gateway = info.has_gateway;
    state.timezone_raw_offset_ms = info.timezone_raw_offset_ms;
    state.auto_lock_seconds = info.auto_lock_seconds;
}

/// Fill `locked` only while it is still unknown. Never regresses a known
/// value to unknown.
pub(crate) fn merge_open_state(state: &mut LockState, reported: Option<bool>) -> bool {
    if state.locked.is_some() || reported.is_none() {
        return false;
    }
    state.locked = reported;
    true
}

impl LockStore {
    /// Apply a detail poll. Returns `false` if the lock is not tracked.
    pub(crate) fn apply_info(&self, id: LockId, info: LockInfo) -> bool {
        self.update(id, |state| merge_info(state, info)).is_some()
    }

    /// Apply a polled open state, re-checking under the write lock that no
    /// push event filled `locked` while the query was in flight.
    pub(crate) fn apply_open_state(&self, id: LockId, reported: Option<bool>) {
        let applied = self.update(id, |state| merge_open_state(state, reported));
        if applied == Some(false) {
            debug!(lock_id = %id, "open state already known, poll result discarded");
        }
    }

    pub(crate) fn apply_passage_mode(&self, id: LockId, config: PassageModeConfig) {
        self.update(id, |state| state.passage_mode = Some(config));
    }

    /// `true` if the lock is tracked and its open state is still unknown.
    pub(crate) fn needs_open_state(&self, id: LockId) -> bool {
        self.get(id).is_some_and(|s| s.locked.is_none())
    }
}
