// ── Auto-lock scheduler ──
//
// One pending re-lock timer per lock. The timer is decided at scheduling
// time and does not re-check passage mode when it fires. A newer unlock
// replaces the pending timer; a manual lock does not cancel it, since
// re-asserting `locked = true` is idempotent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, TimeZone};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::model::LockId;
use crate::store::LockStore;

/// `last_reason` written when a timer re-locks.
pub const AUTO_LOCK_REASON: &str = "Auto Lock";

struct TimerEntry {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Owns the pending re-lock timers of one session.
///
/// Timers hold only a weak reference to the store, so a timer that
/// outlives its session fires into nothing.
pub struct AutoLockScheduler {
    timers: Arc<DashMap<LockId, TimerEntry>>,
    next_generation: AtomicU64,
    cancel: CancellationToken,
}

impl AutoLockScheduler {
    pub fn new() -> Self {
        Self {
            timers: Arc::new(DashMap::new()),
            next_generation: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        }
    }

    /// Schedule a re-lock `delay` after the device-side unlock.
    ///
    /// Delivery latency already elapsed (`server - device`, floored at
    /// zero) is subtracted from the wait. Must be called from within a
    /// tokio runtime.
    pub fn schedule<Tz: TimeZone>(
        &self,
        store: &Arc<LockStore>,
        id: LockId,
        delay: Duration,
        device_timestamp: &DateTime<Tz>,
        server_timestamp: &DateTime<Tz>,
    ) -> Duration {
        let transit = server_timestamp
            .clone()
            .signed_duration_since(device_timestamp.clone())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let wait = delay.saturating_sub(transit);

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let store = Arc::downgrade(store);
        let timers = Arc::clone(&self.timers);
        let cancel = self.cancel.child_token();

        debug!(lock_id = %id, ?delay, ?transit, ?wait, "scheduling auto-lock");
        let timer = async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(wait) => {}
            }
            fire(&store, id);
            timers.remove_if(&id, |_, entry| entry.generation == generation);
        };

        // Spawn while holding the map entry: a timer that finishes at once
        // cannot look for its entry before the entry exists.
        let previous = match self.timers.entry(id) {
            Entry::Occupied(mut slot) => Some(slot.insert(TimerEntry {
                generation,
                handle: tokio::spawn(timer),
            })),
            Entry::Vacant(slot) => {
                slot.insert(TimerEntry {
                    generation,
                    handle: tokio::spawn(timer),
                });
                None
            }
        };
        if let Some(previous) = previous {
            previous.handle.abort();
        }
        wait
    }

    /// `true` while a timer for `id` has not fired yet.
    pub fn has_pending(&self, id: LockId) -> bool {
        self.timers
            .get(&id)
            .is_some_and(|entry| !entry.handle.is_finished())
    }

    /// Drop the pending timer for `id`, if any.
    pub fn cancel(&self, id: LockId) {
        if let Some((_, entry)) = self.timers.remove(&id) {
            entry.handle.abort();
        }
    }

    /// Cancel every pending timer.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.timers.retain(|_, entry| {
            entry.handle.abort();
            false
        });
    }
}

impl Default for AutoLockScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AutoLockScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn fire(store: &Weak<LockStore>, id: LockId) {
    let Some(store) = store.upgrade() else {
        debug!(lock_id = %id, "auto-lock fired after session teardown");
        return;
    };
    let applied = store.update(id, |state| {
        state.locked = Some(true);
        state.last_reason = Some(AUTO_LOCK_REASON.to_owned());
    });
    if applied.is_some() {
        debug!(lock_id = %id, "auto-locked");
    } else {
        debug!(lock_id = %id, "auto-lock fired for untracked lock");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::model::lock::tests::front_door;
    use chrono::Utc;

    fn unlocked_store() -> (Arc<LockStore>, LockId) {
        let store = Arc::new(LockStore::new());
        let mut state = front_door();
        state.locked = Some(false);
        state.last_user = Some("test".into());
        let id = state.id;
        store.insert(state);
        (store, id)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay_minus_transit() {
        let (store, id) = unlocked_store();
        let scheduler = AutoLockScheduler::new();
        let device = Utc::now();
        let server = device + chrono::Duration::seconds(2);

        let wait = scheduler.schedule(&store, id, Duration::from_secs(5), &device, &server);
        assert_eq!(wait, Duration::from_secs(3));

        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert_eq!(store.get(id).unwrap().locked, Some(false));
        assert!(scheduler.has_pending(id));

        tokio::time::sleep(Duration::from_millis(200)).await;
        let state = store.get(id).unwrap();
        assert_eq!(state.locked, Some(true));
        assert_eq!(state.last_reason.as_deref(), Some(AUTO_LOCK_REASON));
        assert_eq!(state.last_user.as_deref(), Some("test"));
        assert!(!scheduler.has_pending(id));
    }

    #[tokio::test(start_paused = true)]
    async fn transit_longer_than_delay_fires_immediately() {
        let (store, id) = unlocked_store();
        let scheduler = AutoLockScheduler::new();
        let device = Utc::now();
        let server = device + chrono::Duration::seconds(90);

        let wait = scheduler.schedule(&store, id, Duration::from_secs(60), &device, &server);
        assert_eq!(wait, Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(store.get(id).unwrap().locked, Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn server_before_device_counts_as_no_transit() {
        let (store, id) = unlocked_store();
        let scheduler = AutoLockScheduler::new();
        let device = Utc::now();
        let server = device - chrono::Duration::seconds(30);

        let wait = scheduler.schedule(&store, id, Duration::from_secs(5), &device, &server);
        assert_eq!(wait, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_unlock_replaces_pending_timer() {
        let (store, id) = unlocked_store();
        let scheduler = AutoLockScheduler::new();
        let now = Utc::now();

        scheduler.schedule(&store, id, Duration::from_secs(5), &now, &now);
        tokio::time::sleep(Duration::from_secs(3)).await;
        scheduler.schedule(&store, id, Duration::from_secs(5), &now, &now);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(store.get(id).unwrap().locked, Some(false));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(store.get(id).unwrap().locked, Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn firing_after_teardown_is_a_no_op() {
        let (store, id) = unlocked_store();
        let scheduler = AutoLockScheduler::new();
        let now = Utc::now();

        scheduler.schedule(&store, id, Duration::from_secs(1), &now, &now);
        store.remove(id);
        drop(store);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!scheduler.has_pending(id));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_timers() {
        let (store, id) = unlocked_store();
        let scheduler = AutoLockScheduler::new();
        let now = Utc::now();

        scheduler.schedule(&store, id, Duration::from_secs(1), &now, &now);
        scheduler.shutdown();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.get(id).unwrap().locked, Some(false));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn immediate_timer_leaves_no_entry_behind() {
        let (store, id) = unlocked_store();
        let scheduler = AutoLockScheduler::new();
        let device = Utc::now();
        let server = device + chrono::Duration::seconds(90);

        for _ in 0..20 {
            store.update(id, |s| s.locked = Some(false));
            let wait = scheduler.schedule(&store, id, Duration::from_secs(60), &device, &server);
            assert_eq!(wait, Duration::ZERO);

            for _ in 0..200 {
                if store.get(id).unwrap().locked == Some(true) && scheduler.timers.is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            assert_eq!(store.get(id).unwrap().locked, Some(true));
            assert!(scheduler.timers.is_empty());
        }
    }
}
