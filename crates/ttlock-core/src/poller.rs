// ── Poll reconciler ──
//
// Fetches details, open state and passage-mode config for each tracked
// lock and merges them into the store. A failure aborts that lock's cycle
// only; fields merged before the failing fetch stay merged.

use futures_util::future::join_all;
use tracing::{debug, warn};
use ttlock_api::TtlockClient;

use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::model::{LockId, LockInfo, LockState, PassageModeConfig};
use crate::store::LockStore;
use crate::store::refresh::open_state_to_locked;

/// Outcome of one poll cycle across all tracked locks.
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub succeeded: Vec<LockId>,
    pub failed: Vec<(LockId, CoreError)>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Ids of connectable locks in the account that pass the allow-list.
pub(crate) async fn discover_locks(
    api: &TtlockClient,
    config: &ControllerConfig,
) -> Result<Vec<LockId>, CoreError> {
    let ids: Vec<LockId> = api
        .list_locks()
        .await?
        .into_iter()
        .map(LockId)
        .filter(|id| config.tracks(*id))
        .collect();
    debug!(count = ids.len(), "discovered locks");
    Ok(ids)
}

/// Poll every id concurrently. Never fails as a whole.
pub(crate) async fn refresh_locks(
    api: &TtlockClient,
    store: &LockStore,
    ids: &[LockId],
) -> RefreshReport {
    let results = join_all(ids.iter().map(|id| async move {
        (*id, poll_lock(api, store, *id).await)
    }))
    .await;

    let mut report = RefreshReport::default();
    for (id, result) in results {
        match result {
            Ok(()) => report.succeeded.push(id),
            Err(e) => {
                warn!(lock_id = %id, error = %e, recoverable = e.is_recoverable(), "lock update failed");
                report.failed.push((id, e));
            }
        }
    }
    report
}

/// One poll cycle for one lock.
///
/// The first successful poll creates the aggregate, and only after every
/// fetch succeeded. Later polls merge in place.
pub(crate) async fn poll_lock(
    api: &TtlockClient,
    store: &LockStore,
    id: LockId,
) -> Result<(), CoreError> {
    let info = LockInfo::from(api.get_lock(id.get()).await?);
    if info.id != id {
        return Err(CoreError::Parse {
            message: format!("asked for lock {id}, got details for {}", info.id),
        });
    }

    if !store.contains(id) {
        let locked = open_state_to_locked(api.get_lock_state(id.get()).await?);
        let passage_mode = PassageModeConfig::from(api.get_passage_mode_config(id.get()).await?);

        let mut state = LockState::new(info.clone());
        state.locked = locked;
        state.passage_mode = Some(passage_mode.clone());
        if store.insert(state) {
            debug!(lock_id = %id, "tracking new lock");
        } else {
            // A concurrent first poll won the insert.
            store.apply_info(id, info);
            store.apply_open_state(id, locked);
            store.apply_passage_mode(id, passage_mode);
        }
        return Ok(());
    }

    store.apply_info(id, info);

    if store.needs_open_state(id) {
        let locked = open_state_to_locked(api.get_lock_state(id.get()).await?);
        store.apply_open_state(id, locked);
    }

    let passage_mode = PassageModeConfig::from(api.get_passage_mode_config(id.get()).await?);
    store.apply_passage_mode(id, passage_mode);

    debug!(lock_id = %id, "lock updated");
    Ok(())
}
