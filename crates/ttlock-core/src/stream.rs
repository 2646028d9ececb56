// ── Per-lock state streams ──
//
// Subscription type for consuming one aggregate's changes.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::LockState;

/// A subscription to one lock.
///
/// Provides point-in-time access and change notification via
/// [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct LockStream {
    current: LockState,
    receiver: watch::Receiver<LockState>,
}

impl LockStream {
    pub(crate) fn new(receiver: watch::Receiver<LockState>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// State captured at creation or at the last `changed()`.
    pub fn current(&self) -> &LockState {
        &self.current
    }

    /// Latest state (may have changed since creation).
    pub fn latest(&self) -> LockState {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. Returns `None` once the lock stops being
    /// tracked.
    pub async fn changed(&mut self) -> Option<LockState> {
        self.receiver.changed().await.ok()?;
        let state = self.receiver.borrow_and_update().clone();
        self.current = state.clone();
        Some(state)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The first item is the current state.
    pub fn into_stream(self) -> LockWatchStream {
        LockWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct LockWatchStream {
    inner: WatchStream<LockState>,
}

impl Stream for LockWatchStream {
    type Item = LockState;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
