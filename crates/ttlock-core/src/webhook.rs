// ── Webhook reconciler ──
//
// Applies pushed activity records to tracked aggregates. Records are
// applied in delivery order, last write wins on `locked`, and nothing is
// deduplicated. Malformed records and records for untracked locks are
// dropped without failing the rest of the batch.

use std::sync::Arc;

use tracing::{debug, warn};
use ttlock_api::WebhookDelivery;

use crate::autolock::AutoLockScheduler;
use crate::model::{LockEvent, LockOutcome};
use crate::store::LockStore;

/// Per-delivery tally.
#[derive(Debug, Default)]
pub struct WebhookReport {
    /// Events routed to a tracked lock, in delivery order.
    pub applied: Vec<LockEvent>,
    /// Well-formed events for locks this session does not track.
    pub ignored: usize,
    /// Records that failed to parse.
    pub malformed: usize,
}

/// Apply one parsed event. Returns `false` if the lock is not tracked.
///
/// A failed operation only refreshes the battery level. A successful one
/// also records actor and reason, moves `locked` when the action implies a
/// bolt position, and hands unlocks to the scheduler.
pub(crate) fn apply_event(
    store: &Arc<LockStore>,
    scheduler: Option<&AutoLockScheduler>,
    event: &LockEvent,
) -> bool {
    let id = event.lock_id;
    let outcome = store.update(id, |state| {
        if let Some(level) = event.battery_level {
            state.battery_level = Some(level);
        }
        if !event.success {
            return None;
        }

        state.last_user.clone_from(&event.username);
        state.last_reason = Some(event.description().to_owned());

        match event.resulting_state() {
            Some(LockOutcome::Locked) => {
                state.locked = Some(true);
                None
            }
            Some(LockOutcome::Unlocked) => {
                state.locked = Some(false);
                state.auto_lock_delay(&event.device_timestamp)
            }
            None => None,
        }
    });

    let Some(auto_lock_delay) = outcome else {
        debug!(lock_id = %id, "event for untracked lock ignored");
        return false;
    };

    debug!(
        lock_id = %id,
        record_type = event.record_type,
        action = %event.action(),
        success = event.success,
        "applied lock event"
    );

    if let (Some(delay), Some(scheduler)) = (auto_lock_delay, scheduler) {
        scheduler.schedule(
            store,
            id,
            delay,
            &event.device_timestamp,
            &event.server_timestamp,
        );
    }
    true
}

/// Parse and apply every record of a delivery.
pub(crate) fn apply_delivery(
    store: &Arc<LockStore>,
    scheduler: Option<&AutoLockScheduler>,
    delivery: &WebhookDelivery,
) -> WebhookReport {
    let mut report = WebhookReport::default();

    for record in &delivery.records {
        let event = match LockEvent::from_record(record) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "skipping malformed webhook record");
                report.malformed += 1;
                continue;
            }
        };

        if apply_event(store, scheduler, &event) {
            report.applied.push(event);
        } else {
            report.ignored += 1;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use std::collections::BTreeSet;
    use std::time::Duration;

    use chrono::{Local, NaiveDate};
    use serde_json::{Value, json};

    use super::*;
    use crate::autolock::AUTO_LOCK_REASON;
    use crate::model::lock::tests::front_door;
    use crate::model::{LockId, PassageModeConfig};

    const FRONT_DOOR: LockId = LockId(7_252_408);

    fn store() -> Arc<LockStore> {
        let store = Arc::new(LockStore::new());
        store.insert(front_door());
        store
    }

    /// Local wall-clock time on 2023-04-19 (a Wednesday).
    fn wednesday_ms(hour: u32, minute: u32) -> i64 {
        NaiveDate::from_ymd_opt(2023, 4, 19)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
            .and_local_timezone(Local)
            .earliest()
            .unwrap()
            .timestamp_millis()
    }

    fn record(record_type: i64, success: Value, at_ms: i64) -> Value {
        json!({
            "lockId": FRONT_DOOR.get(),
            "lockMac": "16:72:4C:CC:01:C4",
            "electricQuantity": 40,
            "serverDate": at_ms,
            "lockDate": at_ms,
            "recordType": record_type,
            "username": "test",
            "success": success,
        })
    }

    fn event(record_type: i64, success: Value, at_ms: i64) -> LockEvent {
        LockEvent::from_record(&record(record_type, success, at_ms)).unwrap()
    }

    #[test]
    fn lock_event_sets_locked() {
        let store = store();
        assert!(apply_event(&store, None, &event(47, json!(1), wednesday_ms(10, 0))));

        let state = store.get(FRONT_DOOR).unwrap();
        assert_eq!(state.locked, Some(true));
        assert_eq!(state.battery_level, Some(40));
        assert_eq!(state.last_user.as_deref(), Some("test"));
        assert_eq!(state.last_reason.as_deref(), Some("lock by lock key"));
    }

    #[test]
    fn failed_event_only_touches_battery() {
        let store = store();
        store.update(FRONT_DOOR, |s| s.locked = Some(true));
        let before = store.get(FRONT_DOOR).unwrap();

        apply_event(&store, None, &event(7, json!(false), wednesday_ms(10, 0)));

        let after = store.get(FRONT_DOOR).unwrap();
        assert_eq!(after.locked, before.locked);
        assert_eq!(after.last_user, before.last_user);
        assert_eq!(after.last_reason, before.last_reason);
        assert_eq!(after.battery_level, Some(40));
    }

    #[test]
    fn unknown_action_updates_actor_but_not_state() {
        let store = store();
        store.update(FRONT_DOOR, |s| s.locked = Some(true));

        apply_event(&store, None, &event(31, json!(1), wednesday_ms(10, 0)));

        let state = store.get(FRONT_DOOR).unwrap();
        assert_eq!(state.locked, Some(true));
        assert_eq!(state.last_reason.as_deref(), Some("Door sensor open"));
        assert_eq!(state.last_user.as_deref(), Some("test"));
    }

    #[test]
    fn untracked_lock_is_a_no_op() {
        let store = Arc::new(LockStore::new());
        assert!(!apply_event(&store, None, &event(7, json!(1), wednesday_ms(10, 0))));
        assert!(store.is_empty());
    }

    #[test]
    fn delivery_skips_malformed_records() {
        let store = store();
        let mut stranger = record(7, json!(1), wednesday_ms(10, 0));
        stranger["lockId"] = json!(1);
        let delivery = WebhookDelivery::from_records(vec![
            json!({ "lockId": FRONT_DOOR.get() }),
            stranger,
            record(7, json!(1), wednesday_ms(10, 0)),
        ]);

        let report = apply_delivery(&store, None, &delivery);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.ignored, 1);
        assert_eq!(report.applied.len(), 1);
        assert_eq!(store.get(FRONT_DOOR).unwrap().locked, Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn unlock_schedules_auto_lock() {
        let store = store();
        store.update(FRONT_DOOR, |s| s.auto_lock_seconds = 1);
        let scheduler = AutoLockScheduler::new();

        apply_event(&store, Some(&scheduler), &event(7, json!(1), wednesday_ms(10, 0)));
        assert_eq!(store.get(FRONT_DOOR).unwrap().locked, Some(false));

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        let state = store.get(FRONT_DOOR).unwrap();
        assert_eq!(state.locked, Some(true));
        assert_eq!(state.last_reason.as_deref(), Some(AUTO_LOCK_REASON));
        assert_eq!(state.last_user.as_deref(), Some("test"));
    }

    #[tokio::test(start_paused = true)]
    async fn unlock_during_passage_mode_stays_unlocked() {
        let store = store();
        store.update(FRONT_DOOR, |s| {
            s.auto_lock_seconds = 1;
            s.passage_mode = Some(PassageModeConfig {
                enabled: true,
                auto_unlock: false,
                all_day: false,
                start_minute: 360,
                end_minute: 1080,
                week_days: (1..=7).collect::<BTreeSet<u8>>(),
            });
        });
        let scheduler = AutoLockScheduler::new();

        apply_event(&store, Some(&scheduler), &event(7, json!(1), wednesday_ms(10, 0)));
        assert!(!scheduler.has_pending(FRONT_DOOR));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(store.get(FRONT_DOOR).unwrap().locked, Some(false));
    }
}
