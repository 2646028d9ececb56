// ── Session controller ──
//
// One `Controller` per account session. Owns the tracked aggregates, the
// auto-lock scheduler and the background poll task, and is the only
// entry point for push deliveries and lock commands.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use ttlock_api::transport::{TlsMode, TransportConfig};
use ttlock_api::{TtlockClient, WebhookDelivery};

use crate::autolock::AutoLockScheduler;
use crate::command::{Command, CommandResult};
use crate::config::{ControllerConfig, TlsVerification};
use crate::device::LockHandle;
use crate::error::CoreError;
use crate::model::{LockEvent, LockId, LockState, NewPasscode, PassageModeConfig, Passcode};
use crate::poller::{RefreshReport, discover_locks, refresh_locks};
use crate::store::LockStore;
use crate::stream::LockStream;
use crate::webhook::{WebhookReport, apply_delivery};

const EVENT_CHANNEL_SIZE: usize = 256;

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Create it, call
/// [`connect()`](Self::connect) to discover locks and start polling, feed
/// it webhook deliveries, and issue commands.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    api: TtlockClient,
    store: Arc<LockStore>,
    scheduler: AutoLockScheduler,
    tracked: Mutex<Vec<LockId>>,
    event_tx: broadcast::Sender<Arc<LockEvent>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Build a controller and its HTTP client. Does NOT connect.
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let api = TtlockClient::new(
            config.api_url.clone(),
            config.client_id.clone(),
            config.access_token.clone(),
            &transport,
        )?;
        Ok(Self::with_client(config, api))
    }

    /// Build a controller around an existing API client.
    pub fn with_client(config: ControllerConfig, api: TtlockClient) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            inner: Arc::new(ControllerInner {
                config,
                api,
                store: Arc::new(LockStore::new()),
                scheduler: AutoLockScheduler::new(),
                tracked: Mutex::new(Vec::new()),
                event_tx,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<LockStore> {
        &self.inner.store
    }

    pub fn scheduler(&self) -> &AutoLockScheduler {
        &self.inner.scheduler
    }

    // ── Session lifecycle ────────────────────────────────────────

    /// Discover locks, run the first poll, and start the background poll.
    ///
    /// Discovery failure is fatal; per-lock failures of the first poll
    /// are returned in the report and retried on the next cycle.
    pub async fn connect(&self) -> Result<RefreshReport, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Disconnected);
        }

        let ids = discover_locks(&self.inner.api, &self.inner.config).await?;
        self.track(ids).await;

        let report = self.refresh().await;

        let interval = self.inner.config.poll_interval;
        if !interval.is_zero() {
            let ctrl = self.clone();
            let cancel = self.inner.cancel.clone();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(refresh_task(ctrl, interval, cancel)));
        }

        info!(
            tracked = self.inner.store.len(),
            failed = report.failed.len(),
            "connected to TTLock"
        );
        Ok(report)
    }

    /// Replace the set of lock ids the poller covers.
    ///
    /// Aggregates are created by the next successful poll of each id.
    pub async fn track(&self, ids: Vec<LockId>) {
        debug!(?ids, "tracking locks");
        *self.inner.tracked.lock().await = ids;
    }

    /// Ids the poller covers, tracked or not yet created.
    pub async fn tracked_ids(&self) -> Vec<LockId> {
        self.inner.tracked.lock().await.clone()
    }

    /// Poll every tracked id once.
    pub async fn refresh(&self) -> RefreshReport {
        let ids = self.inner.tracked.lock().await.clone();
        let report = refresh_locks(&self.inner.api, &self.inner.store, &ids).await;
        debug!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "poll cycle complete"
        );
        report
    }

    /// Stop background work and drop every aggregate.
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        self.inner.scheduler.shutdown();
        self.inner.store.clear();
        debug!("disconnected");
    }

    /// One-shot: connect without background polling, run `f`, disconnect.
    pub async fn oneshot<F, Fut, T>(config: ControllerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.poll_interval = Duration::ZERO;

        let controller = Controller::new(cfg)?;
        controller.connect().await?;
        let result = f(controller.clone()).await;
        controller.disconnect().await;
        result
    }

    // ── Push deliveries ──────────────────────────────────────────

    /// Apply a webhook delivery and re-broadcast every routed event.
    ///
    /// Must be called from within a tokio runtime when auto-lock is on.
    pub fn handle_webhook(&self, delivery: &WebhookDelivery) -> WebhookReport {
        let scheduler = self
            .inner
            .config
            .auto_lock
            .then_some(&self.inner.scheduler);
        let report = apply_delivery(&self.inner.store, scheduler, delivery);

        for event in &report.applied {
            let _ = self.inner.event_tx.send(Arc::new(event.clone()));
        }
        debug!(
            applied = report.applied.len(),
            ignored = report.ignored,
            malformed = report.malformed,
            "webhook delivery processed"
        );
        report
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Lock remotely. `false` on any failure or for an untracked lock.
    pub async fn lock(&self, id: LockId) -> bool {
        self.bolt_command(id, true).await
    }

    /// Unlock remotely. `false` on any failure or for an untracked lock.
    pub async fn unlock(&self, id: LockId) -> bool {
        self.bolt_command(id, false).await
    }

    async fn bolt_command(&self, id: LockId, lock: bool) -> bool {
        let Some(_pending) = PendingAction::begin(&self.inner.store, id) else {
            debug!(lock_id = %id, "command for untracked lock ignored");
            return false;
        };

        let api = &self.inner.api;
        let result = if lock {
            api.lock(id.get()).await
        } else {
            api.unlock(id.get()).await
        };

        match result {
            Ok(()) => {
                self.inner.store.update(id, |s| s.locked = Some(lock));
                true
            }
            Err(e) => {
                let verb = if lock { "lock" } else { "unlock" };
                error!(lock_id = %id, error = %e, "failed to {verb}");
                false
            }
        }
    }

    /// Write a passage-mode schedule. On success the aggregate adopts it.
    pub async fn configure_passage_mode(&self, id: LockId, config: PassageModeConfig) -> bool {
        if !self.inner.store.contains(id) {
            debug!(lock_id = %id, "passage mode for untracked lock ignored");
            return false;
        }
        if let Err(e) = config.validate() {
            warn!(lock_id = %id, error = %e, "rejected passage mode config");
            return false;
        }

        match self
            .inner
            .api
            .set_passage_mode(id.get(), &config.to_params())
            .await
        {
            Ok(()) => {
                self.inner.store.apply_passage_mode(id, config);
                true
            }
            Err(e) => {
                error!(lock_id = %id, error = %e, "failed to configure passage mode");
                false
            }
        }
    }

    /// Create a temporary passcode.
    pub async fn create_passcode(&self, id: LockId, passcode: &NewPasscode) -> bool {
        if !self.inner.store.contains(id) {
            debug!(lock_id = %id, "passcode for untracked lock ignored");
            return false;
        }
        if let Err(e) = passcode.validate() {
            warn!(lock_id = %id, error = %e, "rejected passcode");
            return false;
        }

        match self
            .inner
            .api
            .add_passcode(id.get(), &passcode.to_params())
            .await
        {
            Ok(passcode_id) => {
                debug!(lock_id = %id, ?passcode_id, "passcode created");
                true
            }
            Err(e) => {
                error!(lock_id = %id, error = %e, "failed to create passcode");
                false
            }
        }
    }

    /// Passcodes on the lock. Empty for an untracked lock.
    pub async fn list_passcodes(&self, id: LockId) -> Result<Vec<Passcode>, CoreError> {
        if !self.inner.store.contains(id) {
            return Ok(Vec::new());
        }
        let raw = self.inner.api.list_passcodes(id.get()).await?;
        Ok(raw.into_iter().map(Passcode::from).collect())
    }

    /// Delete every passcode expired at `now`; returns the removed names.
    ///
    /// A failed delete is logged and skipped; the rest still run.
    pub async fn cleanup_passcodes(
        &self,
        id: LockId,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, CoreError> {
        let mut removed = Vec::new();
        for passcode in self.list_passcodes(id).await? {
            if !passcode.is_expired(now) {
                continue;
            }
            match self.inner.api.delete_passcode(id.get(), passcode.id).await {
                Ok(()) => removed.push(passcode.display_name()),
                Err(e) => {
                    error!(lock_id = %id, passcode_id = passcode.id, error = %e, "failed to delete passcode");
                }
            }
        }
        if !removed.is_empty() {
            info!(lock_id = %id, count = removed.len(), "removed expired passcodes");
        }
        Ok(removed)
    }

    /// Route a command. Untracked locks yield [`CommandResult::Ignored`];
    /// invalid input is an error, remote failures are `Failed`.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Disconnected);
        }
        if !self.inner.store.contains(cmd.lock_id()) {
            debug!(lock_id = %cmd.lock_id(), "command for untracked lock ignored");
            return Ok(CommandResult::Ignored);
        }

        match cmd {
            Command::Lock { id } => Ok(CommandResult::from_success(self.lock(id).await)),
            Command::Unlock { id } => Ok(CommandResult::from_success(self.unlock(id).await)),
            Command::ConfigurePassageMode { id, config } => {
                config.validate()?;
                Ok(CommandResult::from_success(
                    self.configure_passage_mode(id, config).await,
                ))
            }
            Command::CreatePasscode { id, passcode } => {
                passcode.validate()?;
                Ok(CommandResult::from_success(
                    self.create_passcode(id, &passcode).await,
                ))
            }
            Command::CleanupPasscodes { id } => match self.cleanup_passcodes(id, Utc::now()).await {
                Ok(removed) => Ok(CommandResult::Removed(removed)),
                Err(e) => {
                    error!(lock_id = %id, error = %e, "failed to list passcodes");
                    Ok(CommandResult::Failed)
                }
            },
        }
    }

    // ── State observation ────────────────────────────────────────

    pub fn lock_state(&self, id: LockId) -> Option<LockState> {
        self.inner.store.get(id)
    }

    /// Every tracked aggregate, ordered by id.
    pub fn locks(&self) -> Vec<LockState> {
        self.inner.store.snapshot()
    }

    /// Capability handle for one tracked lock.
    pub fn handle(&self, id: LockId) -> Option<LockHandle> {
        self.inner
            .store
            .contains(id)
            .then(|| LockHandle::new(self.clone(), id))
    }

    /// Watch one lock's state.
    pub fn subscribe(&self, id: LockId) -> Option<LockStream> {
        self.inner.store.subscribe(id)
    }

    /// Ids of locks as they change.
    pub fn changes(&self) -> broadcast::Receiver<LockId> {
        self.inner.store.changes()
    }

    /// Events routed by the webhook reconciler.
    pub fn events(&self) -> broadcast::Receiver<Arc<LockEvent>> {
        self.inner.event_tx.subscribe()
    }
}

// ── Pending-action guard ─────────────────────────────────────────

/// Holds one in-flight count on the lock for the lifetime of a command.
///
/// Released on drop, so success, failure, panic and cancellation of the
/// command future all release it. `action_pending` stays set until the
/// last overlapping command on the same lock is released.
struct PendingAction {
    store: Arc<LockStore>,
    id: LockId,
}

impl PendingAction {
    fn begin(store: &Arc<LockStore>, id: LockId) -> Option<Self> {
        store.update(id, LockState::begin_command)?;
        Some(Self {
            store: Arc::clone(store),
            id,
        })
    }
}

impl Drop for PendingAction {
    fn drop(&mut self) {
        self.store.update(self.id, LockState::end_command);
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically poll every tracked lock.
async fn refresh_task(controller: Controller, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let report = controller.refresh().await;
                if !report.is_complete() {
                    warn!(failed = report.failed.len(), "periodic poll incomplete");
                }
            }
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn build_transport(config: &ControllerConfig) -> TransportConfig {
    TransportConfig {
        tls: match &config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        },
        timeout: config.timeout,
    }
}
