// ── Lock capability ──
//
// Consumers that only need to read and drive a lock program against
// `LockControl` rather than the whole controller.

use std::future::Future;

use crate::controller::Controller;
use crate::model::{LockId, LockState};

/// What a remotely controllable lock can do.
pub trait LockControl {
    fn id(&self) -> LockId;

    /// Current aggregate, `None` once the lock is no longer tracked.
    fn state(&self) -> Option<LockState>;

    fn battery(&self) -> Option<u8> {
        self.state().and_then(|s| s.battery_level)
    }

    fn lock(&self) -> impl Future<Output = bool> + Send;

    fn unlock(&self) -> impl Future<Output = bool> + Send;
}

/// A tracked lock bound to its session.
#[derive(Clone)]
pub struct LockHandle {
    controller: Controller,
    id: LockId,
}

impl LockHandle {
    pub(crate) fn new(controller: Controller, id: LockId) -> Self {
        Self { controller, id }
    }
}

impl LockControl for LockHandle {
    fn id(&self) -> LockId {
        self.id
    }

    fn state(&self) -> Option<LockState> {
        self.controller.lock_state(self.id)
    }

    fn lock(&self) -> impl Future<Output = bool> + Send {
        self.controller.lock(self.id)
    }

    fn unlock(&self) -> impl Future<Output = bool> + Send {
        self.controller.unlock(self.id)
    }
}

impl std::fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockHandle").field("id", &self.id).finish()
    }
}
