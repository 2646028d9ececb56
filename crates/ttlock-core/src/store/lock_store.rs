// ── Tracked lock aggregates ──
//
// Each aggregate lives in its own `watch` channel. Every mutation runs
// inside `send_if_modified`, which holds that channel's write lock for the
// duration of the closure: writers to one lock are serialized, writers to
// different locks never contend. Closures must not await.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{broadcast, watch};

use crate::model::{LockId, LockState};
use crate::stream::LockStream;

const CHANGE_CHANNEL_SIZE: usize = 256;

/// Concurrent map of lock id to aggregate.
///
/// Observers either watch a single lock ([`subscribe`](Self::subscribe))
/// or receive the id of every lock that changed ([`changes`](Self::changes)).
pub struct LockStore {
    locks: DashMap<LockId, watch::Sender<LockState>>,
    changes: broadcast::Sender<LockId>,
}

impl LockStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_SIZE);
        Self {
            locks: DashMap::new(),
            changes,
        }
    }

    /// Start tracking a lock. Returns `false` (and leaves the existing
    /// aggregate untouched) if the id is already tracked.
    pub fn insert(&self, state: LockState) -> bool {
        let id = state.id;
        let inserted = match self.locks.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let (tx, _) = watch::channel(state);
                slot.insert(tx);
                true
            }
        };
        if inserted {
            let _ = self.changes.send(id);
        }
        inserted
    }

    /// Mutate one aggregate under its write lock.
    ///
    /// Observers are notified only if the state actually changed. Returns
    /// `None` if the lock is not tracked.
    pub fn update<R>(&self, id: LockId, f: impl FnOnce(&mut LockState) -> R) -> Option<R> {
        let mut out = None;
        let modified = {
            let entry = self.locks.get(&id)?;
            entry.send_if_modified(|state| {
                let before = state.clone();
                out = Some(f(state));
                *state != before
            })
        };
        if modified {
            let _ = self.changes.send(id);
        }
        out
    }

    /// Stop tracking a lock. Subscribers see their stream end.
    pub fn remove(&self, id: LockId) -> Option<LockState> {
        let (_, tx) = self.locks.remove(&id)?;
        let last = tx.borrow().clone();
        let _ = self.changes.send(id);
        Some(last)
    }

    pub fn clear(&self) {
        self.locks.clear();
    }

    pub fn get(&self, id: LockId) -> Option<LockState> {
        self.locks.get(&id).map(|tx| tx.borrow().clone())
    }

    pub fn contains(&self, id: LockId) -> bool {
        self.locks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Tracked ids in ascending order.
    pub fn ids(&self) -> Vec<LockId> {
        let mut ids: Vec<LockId> = self.locks.iter().map(|r| *r.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Every aggregate, ordered by id.
    pub fn snapshot(&self) -> Vec<LockState> {
        let mut states: Vec<LockState> =
            self.locks.iter().map(|r| r.value().borrow().clone()).collect();
        states.sort_by_key(|s| s.id);
        states
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Watch one lock.
    pub fn subscribe(&self, id: LockId) -> Option<LockStream> {
        self.locks.get(&id).map(|tx| LockStream::new(tx.subscribe()))
    }

    /// Ids of locks as they change, for observers tracking all locks.
    pub fn changes(&self) -> broadcast::Receiver<LockId> {
        self.changes.subscribe()
    }
}

impl Default for LockStore {
    fn default() -> Self {
        Self::new()
    }
}
