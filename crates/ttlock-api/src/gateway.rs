//! Global serialization of gateway-routed commands.
//!
//! A lock without direct connectivity is reached through the vendor's
//! gateway, and the gateway relays a single command at a time. Two
//! concurrent commands (or a command and an open-state query) interleaved
//! on that path fail on the device side, so every mutating call and every
//! state query holds a [`GatewayLock`] permit for the whole round trip.
//!
//! The resource is process-wide by default ([`GatewayLock::shared`]).
//! Tests and multi-account setups can hand a client a private instance.

use std::sync::{Arc, OnceLock};

use tokio::sync::{Mutex, MutexGuard};

/// Explicit command-serialization resource for the gateway path.
#[derive(Debug, Clone, Default)]
pub struct GatewayLock {
    inner: Arc<Mutex<()>>,
}

/// Proof that the holder owns the gateway path until dropped.
pub struct GatewayPermit<'a> {
    _guard: MutexGuard<'a, ()>,
}

static SHARED: OnceLock<GatewayLock> = OnceLock::new();

impl GatewayLock {
    /// A fresh, independent lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide lock every client uses unless told otherwise.
    pub fn shared() -> Self {
        SHARED.get_or_init(Self::new).clone()
    }

    /// Wait for exclusive use of the gateway path.
    pub async fn acquire(&self) -> GatewayPermit<'_> {
        GatewayPermit {
            _guard: self.inner.lock().await,
        }
    }

    /// `true` while some caller holds a permit.
    pub fn is_busy(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_instances_are_the_same_resource() {
        let a = GatewayLock::shared();
        let b = GatewayLock::shared();
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
    }

    #[tokio::test]
    async fn permit_excludes_other_holders() {
        let gateway = GatewayLock::new();
        let permit = gateway.acquire().await;
        assert!(gateway.is_busy());
        drop(permit);
        assert!(!gateway.is_busy());
    }
}
